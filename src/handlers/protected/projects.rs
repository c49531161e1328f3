// Project routes plus the project/area association endpoints.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::guard::{conflict_on_unique, require_access, Operation};
use crate::access::{load_container, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Area, Project};
use crate::error::ApiError;
use crate::handlers::validate::PageQuery;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

use super::containers::{self, CreateContainer, UpdateContainer};

/// GET /api/projects
pub async fn list(
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Project>> {
    containers::list(ParentKind::Project, &principal, &query).await
}

/// POST /api/projects
pub async fn create(
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateContainer>,
) -> ApiResult<Project> {
    containers::create(ParentKind::Project, &principal, body).await
}

/// GET /api/projects/:project_id
pub async fn show(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Project> {
    containers::show(ParentKind::Project, &principal, project_id).await
}

/// PUT /api/projects/:project_id
pub async fn update(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateContainer>,
) -> ApiResult<Project> {
    containers::update(ParentKind::Project, &principal, project_id, body).await
}

/// DELETE /api/projects/:project_id
pub async fn delete(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    containers::delete(ParentKind::Project, &principal, project_id).await
}

/// GET /api/projects/:project_id/areas
pub async fn list_areas(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<Area>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, ParentKind::Project, project_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;

    let areas = sqlx::query_as::<_, Area>(
        "SELECT a.* FROM areas a \
         JOIN project_areas pa ON pa.area_id = a.id \
         WHERE pa.project_id = $1 ORDER BY a.name",
    )
    .bind(project_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(areas))
}

#[derive(Debug, Deserialize)]
pub struct AttachAreaRequest {
    pub area_id: Uuid,
}

/// POST /api/projects/:project_id/areas
pub async fn attach_area(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AttachAreaRequest>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, ParentKind::Project, project_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM areas WHERE id = $1")
        .bind(body.area_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(ApiError::invalid_field(
            "validation failed",
            "area_id",
            "area does not exist",
        ));
    }

    sqlx::query("INSERT INTO project_areas (project_id, area_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(body.area_id)
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_unique(e, "area already attached to project"))?;

    Ok(ApiResponse::created(json!({
        "project_id": project_id,
        "area_id": body.area_id,
    })))
}

/// DELETE /api/projects/:project_id/areas/:area_id
pub async fn detach_area(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, area_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, ParentKind::Project, project_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    let result = sqlx::query("DELETE FROM project_areas WHERE project_id = $1 AND area_id = $2")
        .bind(project_id)
        .bind(area_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("area not attached to project"));
    }
    Ok(ApiResponse::success(json!({ "detached": area_id })))
}
