// Risk routes under project/workflow stages.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::guard::{invalid_on_fk, require_access, Operation};
use crate::access::{load_container, scope, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::risk::{Risk, RISK_SEVERITIES, RISK_STATUSES};
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateRisk {
    pub title: String,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub responsible_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRisk {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub responsible_id: Option<Uuid>,
}

async fn list(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
) -> ApiResult<Vec<Risk>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    let risks =
        sqlx::query_as::<_, Risk>("SELECT * FROM risks WHERE stage_id = $1 ORDER BY created_at")
            .bind(stage_id)
            .fetch_all(&pool)
            .await?;

    Ok(ApiResponse::success(risks))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    body: CreateRisk,
) -> ApiResult<Risk> {
    let title = validate::non_empty("title", &body.title)?;
    let severity = validate::optional_one_of("severity", body.severity.as_deref(), RISK_SEVERITIES)?
        .unwrap_or_else(|| "medium".to_string());
    let status = validate::optional_one_of("status", body.status.as_deref(), RISK_STATUSES)?
        .unwrap_or_else(|| "open".to_string());

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    let risk = sqlx::query_as::<_, Risk>(
        "INSERT INTO risks (stage_id, title, description, severity, status, responsible_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(stage_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&severity)
    .bind(&status)
    .bind(body.responsible_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "responsible_id"))?;

    Ok(ApiResponse::created(risk))
}

async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    risk_id: Uuid,
    body: UpdateRisk,
) -> ApiResult<Risk> {
    let title = match body.title.as_deref() {
        Some(t) => Some(validate::non_empty("title", t)?),
        None => None,
    };
    let severity = validate::optional_one_of("severity", body.severity.as_deref(), RISK_SEVERITIES)?;
    let status = validate::optional_one_of("status", body.status.as_deref(), RISK_STATUSES)?;

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;
    scope::risk_in_stage(&pool, risk_id, stage_id).await?;

    let risk = sqlx::query_as::<_, Risk>(
        "UPDATE risks SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            severity = COALESCE($4, severity), \
            status = COALESCE($5, status), \
            responsible_id = COALESCE($6, responsible_id), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(risk_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&severity)
    .bind(&status)
    .bind(body.responsible_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "responsible_id"))?;

    Ok(ApiResponse::success(risk))
}

async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    risk_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;
    scope::risk_in_stage(&pool, risk_id, stage_id).await?;

    sqlx::query("DELETE FROM risks WHERE id = $1")
        .bind(risk_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted_id": risk_id })))
}

// Project-scoped routes

pub async fn list_project_risks(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Risk>> {
    list(ParentKind::Project, &principal, project_id, stage_id).await
}

pub async fn create_project_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateRisk>,
) -> ApiResult<Risk> {
    create(ParentKind::Project, &principal, project_id, stage_id, body).await
}

pub async fn update_project_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, risk_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateRisk>,
) -> ApiResult<Risk> {
    update(ParentKind::Project, &principal, project_id, stage_id, risk_id, body).await
}

pub async fn delete_project_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, risk_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, stage_id, risk_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_risks(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Risk>> {
    list(ParentKind::Workflow, &principal, workflow_id, stage_id).await
}

pub async fn create_workflow_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateRisk>,
) -> ApiResult<Risk> {
    create(ParentKind::Workflow, &principal, workflow_id, stage_id, body).await
}

pub async fn update_workflow_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, risk_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateRisk>,
) -> ApiResult<Risk> {
    update(ParentKind::Workflow, &principal, workflow_id, stage_id, risk_id, body).await
}

pub async fn delete_workflow_risk(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, risk_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, stage_id, risk_id).await
}
