use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub body: Option<String>,
    pub is_read: bool,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

pub const NOTIFICATION_KINDS: &[&str] = &["team_invite", "task_assigned", "mention", "system"];
