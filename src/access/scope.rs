//! Scope validation: every nested resource must actually belong to the parent
//! claimed in the route before any read or mutation. A child that exists
//! under a *different* parent reports plain `NotFound`, never `Forbidden`,
//! so its existence elsewhere is not confirmed.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Attachment, Comment, Impediment, Risk, Stage, Task};
use crate::error::ApiError;

use super::{ContainerRef, ParentKind};

/// One-hop parent comparison. `child_parent` is the parent id stored on the
/// fetched child row; `claimed` comes from the route.
pub fn belongs(child_parent: Option<Uuid>, claimed: Uuid) -> bool {
    child_parent == Some(claimed)
}

/// Fetch a stage and verify it belongs to the claimed container.
pub async fn stage_in_container(
    pool: &PgPool,
    stage_id: Uuid,
    parent: &ContainerRef,
) -> Result<Stage, ApiError> {
    let stage = sqlx::query_as::<_, Stage>("SELECT * FROM stages WHERE id = $1")
        .bind(stage_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("stage not found"))?;

    let stored = match parent.kind {
        ParentKind::Project => stage.project_id,
        ParentKind::Workflow => stage.workflow_id,
    };
    if !belongs(stored, parent.id) {
        return Err(ApiError::not_found("stage not found"));
    }
    Ok(stage)
}

pub async fn task_in_stage(
    pool: &PgPool,
    task_id: Uuid,
    stage_id: Uuid,
) -> Result<Task, ApiError> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("task not found"))?;

    if !belongs(Some(task.stage_id), stage_id) {
        return Err(ApiError::not_found("task not found"));
    }
    Ok(task)
}

pub async fn risk_in_stage(
    pool: &PgPool,
    risk_id: Uuid,
    stage_id: Uuid,
) -> Result<Risk, ApiError> {
    let risk = sqlx::query_as::<_, Risk>("SELECT * FROM risks WHERE id = $1")
        .bind(risk_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("risk not found"))?;

    if !belongs(Some(risk.stage_id), stage_id) {
        return Err(ApiError::not_found("risk not found"));
    }
    Ok(risk)
}

pub async fn impediment_in_stage(
    pool: &PgPool,
    impediment_id: Uuid,
    stage_id: Uuid,
) -> Result<Impediment, ApiError> {
    let impediment = sqlx::query_as::<_, Impediment>("SELECT * FROM impediments WHERE id = $1")
        .bind(impediment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("impediment not found"))?;

    if !belongs(Some(impediment.stage_id), stage_id) {
        return Err(ApiError::not_found("impediment not found"));
    }
    Ok(impediment)
}

pub async fn comment_in_container(
    pool: &PgPool,
    comment_id: Uuid,
    parent: &ContainerRef,
) -> Result<Comment, ApiError> {
    let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("comment not found"))?;

    let stored = match parent.kind {
        ParentKind::Project => comment.project_id,
        ParentKind::Workflow => comment.workflow_id,
    };
    if !belongs(stored, parent.id) {
        return Err(ApiError::not_found("comment not found"));
    }
    Ok(comment)
}

pub async fn attachment_in_container(
    pool: &PgPool,
    attachment_id: Uuid,
    parent: &ContainerRef,
) -> Result<Attachment, ApiError> {
    let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = $1")
        .bind(attachment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("attachment not found"))?;

    let stored = match parent.kind {
        ParentKind::Project => attachment.project_id,
        ParentKind::Workflow => attachment.workflow_id,
    };
    if !belongs(stored, parent.id) {
        return Err(ApiError::not_found("attachment not found"));
    }
    Ok(attachment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belongs_requires_exact_parent_match() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(belongs(Some(a), a));
        assert!(!belongs(Some(a), b));
        // A child with no parent of the claimed kind never matches
        assert!(!belongs(None, a));
    }
}
