// Attachment metadata routes. Blob transfer is handled by the file store out
// of band; these endpoints track the stored reference and its uploader.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::guard::{require_access, Operation};
use crate::access::{load_container, scope, AccessLevel, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::Attachment;
use crate::error::ApiError;
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateAttachment {
    pub file_name: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

async fn list(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
) -> ApiResult<Vec<Attachment>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;

    let sql = format!(
        "SELECT * FROM attachments WHERE {} = $1 ORDER BY created_at DESC",
        kind.scope_column()
    );
    let attachments = sqlx::query_as::<_, Attachment>(&sql)
        .bind(parent_id)
        .fetch_all(&pool)
        .await?;

    Ok(ApiResponse::success(attachments))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    body: CreateAttachment,
) -> ApiResult<Attachment> {
    let file_name = validate::non_empty("file_name", &body.file_name)?;
    let file_path = validate::non_empty("file_path", &body.file_path)?;
    let size_bytes = body.size_bytes.unwrap_or(0);
    if size_bytes < 0 {
        return Err(ApiError::invalid_field(
            "validation failed",
            "size_bytes",
            "must not be negative",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    let sql = format!(
        "INSERT INTO attachments ({}, uploader_id, file_name, file_path, content_type, size_bytes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        kind.scope_column()
    );
    let attachment = sqlx::query_as::<_, Attachment>(&sql)
        .bind(parent_id)
        .bind(principal.id)
        .bind(&file_name)
        .bind(&file_path)
        .bind(body.content_type.as_deref().unwrap_or("application/octet-stream"))
        .bind(size_bytes)
        .fetch_one(&pool)
        .await?;

    Ok(ApiResponse::created(attachment))
}

/// The uploader, or a team admin/owner of the container, may delete.
async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    attachment_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    let level = require_access(&pool, principal.id, &container, Operation::View).await?;
    let existing = scope::attachment_in_container(&pool, attachment_id, &container).await?;

    if existing.uploader_id != principal.id && level < AccessLevel::Admin {
        return Err(ApiError::forbidden("insufficient access to delete attachment"));
    }

    sqlx::query("DELETE FROM attachments WHERE id = $1")
        .bind(attachment_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted_id": attachment_id })))
}

// Project-scoped routes

pub async fn list_project_attachments(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<Attachment>> {
    list(ParentKind::Project, &principal, project_id).await
}

pub async fn create_project_attachment(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateAttachment>,
) -> ApiResult<Attachment> {
    create(ParentKind::Project, &principal, project_id, body).await
}

pub async fn delete_project_attachment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, attachment_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_attachments(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Vec<Attachment>> {
    list(ParentKind::Workflow, &principal, workflow_id).await
}

pub async fn create_workflow_attachment(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
    Json(body): Json<CreateAttachment>,
) -> ApiResult<Attachment> {
    create(ParentKind::Workflow, &principal, workflow_id, body).await
}

pub async fn delete_workflow_attachment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, attachment_id).await
}
