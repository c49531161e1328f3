// Comment routes in project/workflow contexts. The author is always the
// resolved principal; mentions fan out notifications at creation time.

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
use crate::database::models::Comment;
use crate::error::ApiError;
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

use super::notifications;

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub body: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub mentions: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComment {
    pub body: String,
}

async fn list(kind: ParentKind, principal: &AuthPrincipal, parent_id: Uuid) -> ApiResult<Vec<Comment>> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;

    let sql = format!(
        "SELECT * FROM comments WHERE {} = $1 ORDER BY created_at",
        kind.scope_column()
    );
    let comments = sqlx::query_as::<_, Comment>(&sql)
        .bind(parent_id)
        .fetch_all(&pool)
        .await?;

    Ok(ApiResponse::success(comments))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    body: CreateComment,
) -> ApiResult<Comment> {
    let text = validate::non_empty("body", &body.body)?;
    validate::max_len("body", &text, 10_000)?;

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::Modify).await?;

    // A threaded reply must reference a comment in the same context
    if let Some(reply_to) = body.parent_id {
        scope::comment_in_container(&pool, reply_to, &container).await?;
    }

    let sql = format!(
        "INSERT INTO comments ({}, author_id, parent_id, body, mentions) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
        kind.scope_column()
    );
    let comment = sqlx::query_as::<_, Comment>(&sql)
        .bind(parent_id)
        .bind(principal.id)
        .bind(body.parent_id)
        .bind(&text)
        .bind(&body.mentions)
        .fetch_one(&pool)
        .await?;

    for mentioned in &comment.mentions {
        if *mentioned != principal.id {
            notifications::push(
                &pool,
                *mentioned,
                "mention",
                &format!("{} mentioned you in a comment", principal.email),
                Some(&comment.body),
            )
            .await;
        }
    }

    Ok(ApiResponse::created(comment))
}

/// Only the author may edit a comment's body.
async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    comment_id: Uuid,
    body: UpdateComment,
) -> ApiResult<Comment> {
    let text = validate::non_empty("body", &body.body)?;

    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    require_access(&pool, principal.id, &container, Operation::View).await?;
    let existing = scope::comment_in_container(&pool, comment_id, &container).await?;

    if existing.author_id != principal.id {
        return Err(ApiError::forbidden("only the author may edit a comment"));
    }

    let comment = sqlx::query_as::<_, Comment>(
        "UPDATE comments SET body = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(comment_id)
    .bind(&text)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(comment))
}

/// The author, or a team admin/owner of the container, may delete.
async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    comment_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let container = load_container(&pool, kind, parent_id).await?;
    let level = require_access(&pool, principal.id, &container, Operation::View).await?;
    let existing = scope::comment_in_container(&pool, comment_id, &container).await?;

    if existing.author_id != principal.id && level < AccessLevel::Admin {
        return Err(ApiError::forbidden("insufficient access to delete comment"));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted_id": comment_id })))
}

// Project-scoped routes

pub async fn list_project_comments(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<Comment>> {
    list(ParentKind::Project, &principal, project_id).await
}

pub async fn create_project_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateComment>,
) -> ApiResult<Comment> {
    create(ParentKind::Project, &principal, project_id, body).await
}

pub async fn update_project_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateComment>,
) -> ApiResult<Comment> {
    update(ParentKind::Project, &principal, project_id, comment_id, body).await
}

pub async fn delete_project_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, comment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, comment_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_comments(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Vec<Comment>> {
    list(ParentKind::Workflow, &principal, workflow_id).await
}

pub async fn create_workflow_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path(workflow_id): Path<Uuid>,
    Json(body): Json<CreateComment>,
) -> ApiResult<Comment> {
    create(ParentKind::Workflow, &principal, workflow_id, body).await
}

pub async fn update_workflow_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateComment>,
) -> ApiResult<Comment> {
    update(ParentKind::Workflow, &principal, workflow_id, comment_id, body).await
}

pub async fn delete_workflow_comment(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, comment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, comment_id).await
}
