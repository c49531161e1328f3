use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Global tag applied to projects via `project_areas`. Names are unique
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
