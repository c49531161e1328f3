use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authenticated actor. Soft-deleted via `deleted_at`, never hard-deleted.
/// The password digest is never selected into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub const PRINCIPAL_ROLES: &[&str] = &["admin", "editor", "member", "user"];

/// Columns for `query_as::<_, Principal>` selects, digest excluded
pub const PRINCIPAL_COLUMNS: &str =
    "id, email, name, role, is_active, created_at, updated_at, deleted_at";
