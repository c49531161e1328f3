//! Shared CRUD implementation for the two container kinds (projects and
//! workflows). The per-kind route modules are thin wrappers over these.

use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::guard::{invalid_on_fk, require_access, require_team_access, Operation};
use crate::access::{load_container, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::project::{Project, CONTAINER_STATUSES, PRIORITIES};
use crate::error::ApiError;
use crate::handlers::validate::{self, PageQuery};
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateContainer {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContainer {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub team_id: Option<Uuid>,
}

/// Containers visible to the principal: owned, or reachable through an
/// active team membership.
pub async fn list(
    kind: ParentKind,
    principal: &AuthPrincipal,
    query: &PageQuery,
) -> ApiResult<Vec<Project>> {
    let (limit, offset) = validate::page_bounds(query);
    let pool = DatabaseManager::pool().await?;

    let sql = format!(
        "SELECT c.* FROM {} c \
         LEFT JOIN team_members tm ON tm.team_id = c.team_id \
             AND tm.principal_id = $1 AND tm.status = 'active' \
         WHERE c.owner_id = $1 OR tm.principal_id IS NOT NULL \
         ORDER BY c.created_at DESC LIMIT $2 OFFSET $3",
        kind.table()
    );
    let rows = sqlx::query_as::<_, Project>(&sql)
        .bind(principal.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    Ok(ApiResponse::success(rows))
}

pub async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    body: CreateContainer,
) -> ApiResult<Project> {
    let name = validate::non_empty("name", &body.name)?;
    validate::max_len("name", &name, 200)?;
    let status = validate::optional_one_of("status", body.status.as_deref(), CONTAINER_STATUSES)?
        .unwrap_or_else(|| "planning".to_string());
    let priority = validate::optional_one_of("priority", body.priority.as_deref(), PRIORITIES)?
        .unwrap_or_else(|| "medium".to_string());

    let pool = DatabaseManager::pool().await?;
    if let Some(team_id) = body.team_id {
        ensure_team_attachable(&pool, principal, team_id).await?;
    }

    let sql = format!(
        "INSERT INTO {} (name, description, status, priority, owner_id, team_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        kind.table()
    );
    let container = sqlx::query_as::<_, Project>(&sql)
        .bind(&name)
        .bind(&body.description)
        .bind(&status)
        .bind(&priority)
        .bind(principal.id)
        .bind(body.team_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| invalid_on_fk(e, "team_id"))?;

    Ok(ApiResponse::created(container))
}

pub async fn show(kind: ParentKind, principal: &AuthPrincipal, id: Uuid) -> ApiResult<Project> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;

    let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
    let row = sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .fetch_one(&pool)
        .await?;

    Ok(ApiResponse::success(row))
}

pub async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    id: Uuid,
    body: UpdateContainer,
) -> ApiResult<Project> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    let name = match body.name.as_deref() {
        Some(n) => {
            let n = validate::non_empty("name", n)?;
            validate::max_len("name", &n, 200)?;
            Some(n)
        }
        None => None,
    };
    let status = validate::optional_one_of("status", body.status.as_deref(), CONTAINER_STATUSES)?;
    let priority = validate::optional_one_of("priority", body.priority.as_deref(), PRIORITIES)?;

    if let Some(team_id) = body.team_id {
        ensure_team_attachable(&pool, principal, team_id).await?;
    }

    let sql = format!(
        "UPDATE {} SET \
            name = COALESCE($2, name), \
            description = COALESCE($3, description), \
            status = COALESCE($4, status), \
            priority = COALESCE($5, priority), \
            team_id = COALESCE($6, team_id), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
        kind.table()
    );
    let row = sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .bind(&name)
        .bind(&body.description)
        .bind(&status)
        .bind(&priority)
        .bind(body.team_id)
        .fetch_one(&pool)
        .await?;

    Ok(ApiResponse::success(row))
}

/// Deleting a container cascades to its stage/task tree (FK cascade), never
/// silently orphaning rows.
pub async fn delete(kind: ParentKind, principal: &AuthPrincipal, id: Uuid) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, id).await?;
    require_access(&pool, principal.id, &container, Operation::Delete).await?;

    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    sqlx::query(&sql).bind(id).execute(&pool).await?;

    Ok(ApiResponse::success(json!({ "deleted_id": id })))
}

/// Attaching a container to a team requires the caller to be at least an
/// active member of that team.
async fn ensure_team_attachable(
    pool: &PgPool,
    principal: &AuthPrincipal,
    team_id: Uuid,
) -> Result<(), ApiError> {
    let created_by = sqlx::query_scalar::<_, Uuid>("SELECT created_by FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            ApiError::invalid_field("validation failed", "team_id", "team does not exist")
        })?;

    require_team_access(pool, principal.id, team_id, created_by, Operation::Modify).await?;
    Ok(())
}
