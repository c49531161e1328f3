// Per-principal notifications: list, mark one read, mark all read. `push` is
// the internal producer used by task assignment, mentions, and team invites.

use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::Notification;
use crate::error::ApiError;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

/// Best-effort notification insert. A failure here never fails the primary
/// operation; it is logged and dropped. Email dispatch is a separate concern;
/// `email_sent` starts false.
pub async fn push(
    pool: &PgPool,
    recipient: Uuid,
    kind: &str,
    title: &str,
    body: Option<&str>,
) {
    let result = sqlx::query(
        "INSERT INTO notifications (principal_id, kind, priority, title, body) \
         VALUES ($1, $2, 'normal', $3, $4)",
    )
    .bind(recipient)
    .bind(kind)
    .bind(title)
    .bind(body)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("failed to insert {} notification for {}: {}", kind, recipient, e);
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
}

/// GET /api/notifications - the caller's own notifications, newest first
pub async fn list(
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let pool = DatabaseManager::pool().await?;

    let notifications = if query.unread.unwrap_or(false) {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE principal_id = $1 AND is_read = FALSE \
             ORDER BY created_at DESC",
        )
        .bind(principal.id)
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE principal_id = $1 ORDER BY created_at DESC",
        )
        .bind(principal.id)
        .fetch_all(&pool)
        .await?
    };

    Ok(ApiResponse::success(notifications))
}

/// POST /api/notifications/:notification_id/read
///
/// Scoped to the caller: another principal's notification reads as NotFound.
pub async fn mark_read(
    Extension(principal): Extension<AuthPrincipal>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Notification> {
    let pool = DatabaseManager::pool().await?;

    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE \
         WHERE id = $1 AND principal_id = $2 RETURNING *",
    )
    .bind(notification_id)
    .bind(principal.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("notification not found"))?;

    Ok(ApiResponse::success(notification))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    Extension(principal): Extension<AuthPrincipal>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE principal_id = $1 AND is_read = FALSE",
    )
    .bind(principal.id)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "marked_read": result.rows_affected() })))
}
