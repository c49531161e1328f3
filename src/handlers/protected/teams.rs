// Team and membership routes. Deleting a team detaches its projects and
// workflows (team_id set NULL) instead of cascading into them; membership
// rows themselves cascade with the team.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::guard::{conflict_on_unique, require_team_access, Operation};
use crate::access::AccessLevel;
use crate::database::manager::DatabaseManager;
use crate::database::models::team::{Team, TeamMember, TEAM_MEMBER_ROLES, TEAM_MEMBER_STATUSES};
use crate::error::ApiError;
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

use super::notifications;

async fn load_team(pool: &PgPool, team_id: Uuid) -> Result<Team, ApiError> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("team not found"))
}

/// GET /api/teams - teams the caller created or actively belongs to
pub async fn list(Extension(principal): Extension<AuthPrincipal>) -> ApiResult<Vec<Team>> {
    let pool = DatabaseManager::pool().await?;

    let teams = sqlx::query_as::<_, Team>(
        "SELECT t.* FROM teams t \
         LEFT JOIN team_members tm ON tm.team_id = t.id \
             AND tm.principal_id = $1 AND tm.status = 'active' \
         WHERE t.created_by = $1 OR tm.principal_id IS NOT NULL \
         ORDER BY t.name",
    )
    .bind(principal.id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(teams))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub is_private: Option<bool>,
}

/// POST /api/teams - the creator gets an active admin membership row
pub async fn create(
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateTeam>,
) -> ApiResult<Team> {
    let name = validate::non_empty("name", &body.name)?;
    validate::max_len("name", &name, 200)?;

    let pool = DatabaseManager::pool().await?;
    let team = sqlx::query_as::<_, Team>(
        "INSERT INTO teams (name, is_private, created_by) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&name)
    .bind(body.is_private.unwrap_or(false))
    .bind(principal.id)
    .fetch_one(&pool)
    .await?;

    sqlx::query(
        "INSERT INTO team_members (team_id, principal_id, role, status) \
         VALUES ($1, $2, 'admin', 'active')",
    )
    .bind(team.id)
    .bind(principal.id)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::created(team))
}

/// GET /api/teams/:team_id
pub async fn show(
    Extension(principal): Extension<AuthPrincipal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Team> {
    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;
    require_team_access(&pool, principal.id, team.id, team.created_by, Operation::View).await?;
    Ok(ApiResponse::success(team))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub is_private: Option<bool>,
}

/// PUT /api/teams/:team_id - team admins and the creator only
pub async fn update(
    Extension(principal): Extension<AuthPrincipal>,
    Path(team_id): Path<Uuid>,
    Json(body): Json<UpdateTeam>,
) -> ApiResult<Team> {
    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;
    require_team_access(&pool, principal.id, team.id, team.created_by, Operation::Manage).await?;

    let name = match body.name.as_deref() {
        Some(n) => Some(validate::non_empty("name", n)?),
        None => None,
    };

    let team = sqlx::query_as::<_, Team>(
        "UPDATE teams SET \
            name = COALESCE($2, name), \
            is_private = COALESCE($3, is_private), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(team_id)
    .bind(&name)
    .bind(body.is_private)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(team))
}

/// DELETE /api/teams/:team_id
///
/// Projects and workflows referencing the team are detached, never deleted;
/// the response reports how many were detached.
pub async fn delete(
    Extension(principal): Extension<AuthPrincipal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;
    require_team_access(&pool, principal.id, team.id, team.created_by, Operation::Delete).await?;

    let detached_projects = sqlx::query("UPDATE projects SET team_id = NULL WHERE team_id = $1")
        .bind(team_id)
        .execute(&pool)
        .await?
        .rows_affected();
    let detached_workflows = sqlx::query("UPDATE workflows SET team_id = NULL WHERE team_id = $1")
        .bind(team_id)
        .execute(&pool)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({
        "deleted_id": team_id,
        "detached_projects": detached_projects,
        "detached_workflows": detached_workflows,
    })))
}

/// GET /api/teams/:team_id/members
pub async fn list_members(
    Extension(principal): Extension<AuthPrincipal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Vec<TeamMember>> {
    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;
    require_team_access(&pool, principal.id, team.id, team.created_by, Operation::View).await?;

    let members = sqlx::query_as::<_, TeamMember>(
        "SELECT * FROM team_members WHERE team_id = $1 ORDER BY joined_at",
    )
    .bind(team_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(members))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub principal_id: Uuid,
    pub role: Option<String>,
}

/// POST /api/teams/:team_id/members - invite; the new row starts `pending`
pub async fn add_member(
    Extension(principal): Extension<AuthPrincipal>,
    Path(team_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<TeamMember> {
    let role = validate::optional_one_of("role", body.role.as_deref(), TEAM_MEMBER_ROLES)?
        .unwrap_or_else(|| "member".to_string());

    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;
    require_team_access(&pool, principal.id, team.id, team.created_by, Operation::Manage).await?;

    let invitee = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM principals WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(body.principal_id)
    .fetch_optional(&pool)
    .await?;
    if invitee.is_none() {
        return Err(ApiError::invalid_field(
            "validation failed",
            "principal_id",
            "principal does not exist",
        ));
    }

    let member = sqlx::query_as::<_, TeamMember>(
        "INSERT INTO team_members (team_id, principal_id, role, status) \
         VALUES ($1, $2, $3, 'pending') RETURNING *",
    )
    .bind(team_id)
    .bind(body.principal_id)
    .bind(&role)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_unique(e, "principal is already a team member"))?;

    notifications::push(
        &pool,
        body.principal_id,
        "team_invite",
        &format!("You were invited to team {}", team.name),
        None,
    )
    .await;

    Ok(ApiResponse::created(member))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// PUT /api/teams/:team_id/members/:principal_id
///
/// Admins may change role and status freely. A member may change only their
/// own status (accept an invite or go inactive).
pub async fn update_member(
    Extension(principal): Extension<AuthPrincipal>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberRequest>,
) -> ApiResult<TeamMember> {
    let role = validate::optional_one_of("role", body.role.as_deref(), TEAM_MEMBER_ROLES)?;
    let status = validate::optional_one_of("status", body.status.as_deref(), TEAM_MEMBER_STATUSES)?;

    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;

    let level = crate::access::check_team_access(&pool, principal.id, team.id, team.created_by)
        .await
        .map_err(ApiError::from)?;

    let self_status_only = principal.id == member_id && role.is_none();
    if level < AccessLevel::Admin && !self_status_only {
        return Err(ApiError::forbidden("insufficient access to team"));
    }

    let member = sqlx::query_as::<_, TeamMember>(
        "UPDATE team_members SET \
            role = COALESCE($3, role), \
            status = COALESCE($4, status) \
         WHERE team_id = $1 AND principal_id = $2 RETURNING *",
    )
    .bind(team_id)
    .bind(member_id)
    .bind(&role)
    .bind(&status)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("team member not found"))?;

    Ok(ApiResponse::success(member))
}

/// DELETE /api/teams/:team_id/members/:principal_id - admins, or self-leave
pub async fn remove_member(
    Extension(principal): Extension<AuthPrincipal>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let team = load_team(&pool, team_id).await?;

    let level = crate::access::check_team_access(&pool, principal.id, team.id, team.created_by)
        .await
        .map_err(ApiError::from)?;
    if level < AccessLevel::Admin && principal.id != member_id {
        return Err(ApiError::forbidden("insufficient access to team"));
    }

    let result = sqlx::query(
        "DELETE FROM team_members WHERE team_id = $1 AND principal_id = $2",
    )
    .bind(team_id)
    .bind(member_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("team member not found"));
    }
    Ok(ApiResponse::success(json!({ "removed": member_id })))
}
