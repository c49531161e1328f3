use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Impediment {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub criticality: String,
    pub status: String,
    pub responsible_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const IMPEDIMENT_CRITICALITIES: &[&str] = &["low", "medium", "high", "critical"];
pub const IMPEDIMENT_STATUSES: &[&str] = &["open", "resolving", "resolved"];
