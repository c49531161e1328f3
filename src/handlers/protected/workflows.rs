// Workflow routes: same container surface as projects, separate table.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::access::ParentKind;
use crate::database::models::Workflow;
use crate::handlers::validate::PageQuery;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::ApiResult;

use super::containers::{self, CreateContainer, UpdateContainer};

/// GET /api/workflows
pub async fn list(
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Workflow>> {
    containers::list(ParentKind::Workflow, &principal, &query).await
}

/// POST /api/workflows
pub async fn create(
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateContainer>,
) -> ApiResult<Workflow> {
    containers::create(ParentKind::Workflow, &principal, body).await
}

/// GET /api/workflows/:workflow_id
pub async fn show(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Workflow> {
    containers::show(ParentKind::Workflow, &principal, workflow_id).await
}

/// PUT /api/workflows/:workflow_id
pub async fn update(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
    Json(body): Json<UpdateContainer>,
) -> ApiResult<Workflow> {
    containers::update(ParentKind::Workflow, &principal, workflow_id, body).await
}

/// DELETE /api/workflows/:workflow_id
pub async fn delete(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Value> {
    containers::delete(ParentKind::Workflow, &principal, workflow_id).await
}
