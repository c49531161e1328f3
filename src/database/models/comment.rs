use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Comment in a project or workflow context. `parent_id` threads replies;
/// `mentions` fan out `mention` notifications at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub mentions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
