// Impediment routes under project/workflow stages. Same guard chain as
// risks: container access, stage scope, then the row itself.

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
use crate::database::models::impediment::{
    Impediment, IMPEDIMENT_CRITICALITIES, IMPEDIMENT_STATUSES,
};
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateImpediment {
    pub title: String,
    pub description: Option<String>,
    pub criticality: Option<String>,
    pub status: Option<String>,
    pub responsible_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateImpediment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub criticality: Option<String>,
    pub status: Option<String>,
    pub responsible_id: Option<Uuid>,
}

async fn list(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
) -> ApiResult<Vec<Impediment>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    let impediments = sqlx::query_as::<_, Impediment>(
        "SELECT * FROM impediments WHERE stage_id = $1 ORDER BY created_at",
    )
    .bind(stage_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(impediments))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    body: CreateImpediment,
) -> ApiResult<Impediment> {
    let title = validate::non_empty("title", &body.title)?;
    let criticality = validate::optional_one_of(
        "criticality",
        body.criticality.as_deref(),
        IMPEDIMENT_CRITICALITIES,
    )?
    .unwrap_or_else(|| "medium".to_string());
    let status = validate::optional_one_of("status", body.status.as_deref(), IMPEDIMENT_STATUSES)?
        .unwrap_or_else(|| "open".to_string());

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;

    let impediment = sqlx::query_as::<_, Impediment>(
        "INSERT INTO impediments (stage_id, title, description, criticality, status, responsible_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(stage_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&criticality)
    .bind(&status)
    .bind(body.responsible_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "responsible_id"))?;

    Ok(ApiResponse::created(impediment))
}

async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    impediment_id: Uuid,
    body: UpdateImpediment,
) -> ApiResult<Impediment> {
    let title = match body.title.as_deref() {
        Some(t) => Some(validate::non_empty("title", t)?),
        None => None,
    };
    let criticality = validate::optional_one_of(
        "criticality",
        body.criticality.as_deref(),
        IMPEDIMENT_CRITICALITIES,
    )?;
    let status = validate::optional_one_of("status", body.status.as_deref(), IMPEDIMENT_STATUSES)?;

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;
    scope::impediment_in_stage(&pool, impediment_id, stage_id).await?;

    let impediment = sqlx::query_as::<_, Impediment>(
        "UPDATE impediments SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            criticality = COALESCE($4, criticality), \
            status = COALESCE($5, status), \
            responsible_id = COALESCE($6, responsible_id), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(impediment_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&criticality)
    .bind(&status)
    .bind(body.responsible_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "responsible_id"))?;

    Ok(ApiResponse::success(impediment))
}

async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    impediment_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;
    scope::stage_in_container(&pool, stage_id, &container).await?;
    scope::impediment_in_stage(&pool, impediment_id, stage_id).await?;

    sqlx::query("DELETE FROM impediments WHERE id = $1")
        .bind(impediment_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted_id": impediment_id })))
}

// Project-scoped routes

pub async fn list_project_impediments(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Impediment>> {
    list(ParentKind::Project, &principal, project_id, stage_id).await
}

pub async fn create_project_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateImpediment>,
) -> ApiResult<Impediment> {
    create(ParentKind::Project, &principal, project_id, stage_id, body).await
}

pub async fn update_project_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, impediment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateImpediment>,
) -> ApiResult<Impediment> {
    update(ParentKind::Project, &principal, project_id, stage_id, impediment_id, body).await
}

pub async fn delete_project_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, impediment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, stage_id, impediment_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_impediments(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Impediment>> {
    list(ParentKind::Workflow, &principal, workflow_id, stage_id).await
}

pub async fn create_workflow_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateImpediment>,
) -> ApiResult<Impediment> {
    create(ParentKind::Workflow, &principal, workflow_id, stage_id, body).await
}

pub async fn update_workflow_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, impediment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateImpediment>,
) -> ApiResult<Impediment> {
    update(ParentKind::Workflow, &principal, workflow_id, stage_id, impediment_id, body).await
}

pub async fn delete_workflow_impediment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, impediment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, stage_id, impediment_id).await
}
