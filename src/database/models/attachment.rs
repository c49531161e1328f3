use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored file reference. Byte transfer happens out of band; only the path
/// and metadata live here, ownership tracked by uploader.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
