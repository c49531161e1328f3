// Stage routes for both container kinds. Positions order stages within the
// parent and must be unique there (monotonic, not necessarily contiguous).

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::counters::recompute_after_mutation;
use crate::access::guard::{conflict_on_unique, require_access, Operation};
use crate::access::{load_container, scope, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::Stage;
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateStage {
    pub name: String,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStage {
    pub name: Option<String>,
    pub position: Option<i32>,
}

async fn list(kind: ParentKind, principal: &AuthPrincipal, parent_id: Uuid) -> ApiResult<Vec<Stage>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;

    let sql = format!(
        "SELECT * FROM stages WHERE {} = $1 ORDER BY position",
        kind.scope_column()
    );
    let stages = sqlx::query_as::<_, Stage>(&sql)
        .bind(parent_id)
        .fetch_all(&pool)
        .await?;

    Ok(ApiResponse::success(stages))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    body: CreateStage,
) -> ApiResult<Stage> {
    let name = validate::non_empty("name", &body.name)?;
    validate::max_len("name", &name, 200)?;

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    let position = match body.position {
        Some(p) => p,
        None => {
            let sql = format!(
                "SELECT COALESCE(MAX(position) + 1, 1) FROM stages WHERE {} = $1",
                kind.scope_column()
            );
            sqlx::query_scalar::<_, i32>(&sql)
                .bind(parent_id)
                .fetch_one(&pool)
                .await?
        }
    };

    let sql = format!(
        "INSERT INTO stages ({}, name, position) VALUES ($1, $2, $3) RETURNING *",
        kind.scope_column()
    );
    let stage = sqlx::query_as::<_, Stage>(&sql)
        .bind(parent_id)
        .bind(&name)
        .bind(position)
        .fetch_one(&pool)
        .await
        .map_err(|e| conflict_on_unique(e, "stage position already in use"))?;

    Ok(ApiResponse::created(stage))
}

async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    body: UpdateStage,
) -> ApiResult<Stage> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    let name = match body.name.as_deref() {
        Some(n) => Some(validate::non_empty("name", n)?),
        None => None,
    };

    let stage = sqlx::query_as::<_, Stage>(
        "UPDATE stages SET \
            name = COALESCE($2, name), \
            position = COALESCE($3, position) \
         WHERE id = $1 RETURNING *",
    )
    .bind(stage_id)
    .bind(&name)
    .bind(body.position)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_unique(e, "stage position already in use"))?;

    Ok(ApiResponse::success(stage))
}

/// Deleting a stage cascades to its tasks, so the container counters are
/// recomputed afterwards.
async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    sqlx::query("DELETE FROM stages WHERE id = $1")
        .bind(stage_id)
        .execute(&pool)
        .await?;

    recompute_after_mutation(&pool, kind, parent_id).await;
    Ok(ApiResponse::success(json!({ "deleted_id": stage_id })))
}

// Project-scoped routes

pub async fn list_project_stages(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<Stage>> {
    list(ParentKind::Project, &principal, project_id).await
}

pub async fn create_project_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateStage>,
) -> ApiResult<Stage> {
    create(ParentKind::Project, &principal, project_id, body).await
}

pub async fn update_project_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateStage>,
) -> ApiResult<Stage> {
    update(ParentKind::Project, &principal, project_id, stage_id, body).await
}

pub async fn delete_project_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, stage_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_stages(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Vec<Stage>> {
    list(ParentKind::Workflow, &principal, workflow_id).await
}

pub async fn create_workflow_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
    Json(body): Json<CreateStage>,
) -> ApiResult<Stage> {
    create(ParentKind::Workflow, &principal, workflow_id, body).await
}

pub async fn update_workflow_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateStage>,
) -> ApiResult<Stage> {
    update(ParentKind::Workflow, &principal, workflow_id, stage_id, body).await
}

pub async fn delete_workflow_stage(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, stage_id).await
}
