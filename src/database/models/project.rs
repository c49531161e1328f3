use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Top-level unit of work. `total_tasks`/`completed_tasks`/
/// `progress_percentage` are denormalized and recomputed from the task rows
/// after every task mutation, never patched incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub owner_id: Uuid,
    pub team_id: Option<Uuid>,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub progress_percentage: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Workflows share the project row shape but live in their own table and
/// carry their own stage/task tree.
pub type Workflow = Project;

pub const CONTAINER_STATUSES: &[&str] =
    &["planning", "active", "on_hold", "completed", "cancelled"];
pub const PRIORITIES: &[&str] = &["low", "medium", "high", "critical"];
