use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ordered phase within a project or workflow. Exactly one of
/// `project_id`/`workflow_id` is set (enforced by a table CHECK); `position`
/// is unique within the parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stage {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}
