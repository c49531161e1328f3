//! Mutation guard: the single place where required access levels, uniqueness
//! checks, and referential delete guards are applied. Route handlers call
//! these instead of hand-rolling their own checks.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

use super::{check_access, check_team_access, AccessLevel, ContainerRef};

/// Operation classes with their minimum required level. Reads and ordinary
/// writes accept an active member; managing the resource itself (settings,
/// membership) and deleting it require team-admin or owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    View,
    Modify,
    Manage,
    Delete,
}

impl Operation {
    pub fn required_level(&self) -> AccessLevel {
        match self {
            Operation::View | Operation::Modify => AccessLevel::Member,
            Operation::Manage | Operation::Delete => AccessLevel::Admin,
        }
    }
}

/// Pre-check for a container-scoped operation. Fails fast before any
/// mutation: `Forbidden` on insufficient level, `Unavailable` (via
/// `AccessError`) when the lookup itself fails.
pub async fn require_access(
    pool: &PgPool,
    principal_id: Uuid,
    resource: &ContainerRef,
    operation: Operation,
) -> Result<AccessLevel, ApiError> {
    let level = check_access(pool, principal_id, resource).await?;
    if level >= operation.required_level() {
        Ok(level)
    } else {
        Err(ApiError::forbidden(format!(
            "insufficient access to {}",
            resource.kind.label()
        )))
    }
}

/// Same pre-check for team-scoped operations.
pub async fn require_team_access(
    pool: &PgPool,
    principal_id: Uuid,
    team_id: Uuid,
    created_by: Uuid,
    operation: Operation,
) -> Result<AccessLevel, ApiError> {
    let level = check_team_access(pool, principal_id, team_id, created_by).await?;
    if level >= operation.required_level() {
        Ok(level)
    } else {
        Err(ApiError::forbidden("insufficient access to team"))
    }
}

/// Case-insensitive area-name uniqueness. Best-effort check-then-insert; the
/// unique index on lower(name) is the actual guarantee, and a racing insert
/// surfaces through `conflict_on_unique`.
pub async fn ensure_area_name_available(
    pool: &PgPool,
    name: &str,
    exclude_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let normalized = normalize_name(name);
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM areas WHERE lower(name) = $1")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(id) if Some(id) != exclude_id => {
            Err(ApiError::conflict("area name already exists"))
        }
        _ => Ok(()),
    }
}

/// Referential delete guard: an area referenced by any project association
/// refuses deletion.
pub async fn ensure_area_unreferenced(pool: &PgPool, area_id: Uuid) -> Result<(), ApiError> {
    let references =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM project_areas WHERE area_id = $1")
            .bind(area_id)
            .fetch_one(pool)
            .await?;

    if references > 0 {
        Err(ApiError::conflict("area is referenced by projects"))
    } else {
        Ok(())
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Map a unique-constraint violation (Postgres 23505) to `Conflict`,
/// everything else through the usual store mapping.
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::conflict(message);
        }
    }
    err.into()
}

/// Map a foreign-key violation (Postgres 23503) to a field-level `Invalid`.
pub fn invalid_on_fk(err: sqlx::Error, field: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23503") {
            return ApiError::invalid_field("validation failed", field, "referenced row does not exist");
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_requires_admin_or_better() {
        assert_eq!(Operation::Delete.required_level(), AccessLevel::Admin);
        assert!(AccessLevel::Owner >= Operation::Delete.required_level());
        assert!(AccessLevel::Admin >= Operation::Delete.required_level());
        assert!(AccessLevel::Member < Operation::Delete.required_level());
    }

    #[test]
    fn manage_requires_admin_or_better() {
        assert_eq!(Operation::Manage.required_level(), AccessLevel::Admin);
        assert!(AccessLevel::Member < Operation::Manage.required_level());
    }

    #[test]
    fn member_suffices_for_reads_and_writes() {
        assert!(AccessLevel::Member >= Operation::View.required_level());
        assert!(AccessLevel::Member >= Operation::Modify.required_level());
        assert!(AccessLevel::None < Operation::View.required_level());
    }

    #[test]
    fn name_normalization_is_case_insensitive() {
        assert_eq!(normalize_name("Engineering"), normalize_name("engineering"));
        assert_eq!(normalize_name("  Ops  "), "ops");
        assert_ne!(normalize_name("ops"), normalize_name("opsec"));
    }
}
