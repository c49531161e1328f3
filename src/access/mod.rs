//! Authorization and cross-entity consistency layer.
//!
//! Every entity-scoped handler goes through the same pipeline: the identity
//! middleware resolves the principal, `check_access` resolves the principal's
//! level on the owning container, `scope` verifies nested parent claims, and
//! `guard` wraps mutations with the level/uniqueness/referential checks plus
//! counter recomputation.

pub mod counters;
pub mod guard;
pub mod scope;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Privilege levels, ordered. Owner always beats any team role; levels are
/// never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    None,
    Member,
    Admin,
    Owner,
}

/// Store failure during an access lookup. Deliberately distinct from
/// `AccessLevel::None`: an outage must never read as "access denied".
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access lookup unavailable: {0}")]
    Unavailable(String),
}

/// The two container kinds that own stage/task trees, comments, and
/// attachments. Table and column names are fixed strings, never derived from
/// client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Project,
    Workflow,
}

impl ParentKind {
    pub fn table(&self) -> &'static str {
        match self {
            ParentKind::Project => "projects",
            ParentKind::Workflow => "workflows",
        }
    }

    /// Column on `stages`/`comments`/`attachments` that references this kind
    pub fn scope_column(&self) -> &'static str {
        match self {
            ParentKind::Project => "project_id",
            ParentKind::Workflow => "workflow_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ParentKind::Project => "project",
            ParentKind::Workflow => "workflow",
        }
    }
}

/// Minimal view of a container used by the access resolver: identity plus the
/// two fields the access algorithm reads.
#[derive(Debug, Clone, Copy)]
pub struct ContainerRef {
    pub kind: ParentKind,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MembershipRow {
    pub role: String,
    pub status: String,
}

/// Pure access resolution over already-fetched rows. Most-privileged match
/// wins: owner first, then an active membership's role, else none.
pub fn resolve_access(
    principal_id: Uuid,
    owner_id: Uuid,
    membership: Option<&MembershipRow>,
) -> AccessLevel {
    if principal_id == owner_id {
        return AccessLevel::Owner;
    }
    match membership {
        Some(m) if m.status == "active" => {
            if m.role == "admin" {
                AccessLevel::Admin
            } else {
                AccessLevel::Member
            }
        }
        _ => AccessLevel::None,
    }
}

/// Ownership/membership resolver for a container. A store failure propagates
/// as `AccessError::Unavailable`, never as a denied level.
pub async fn check_access(
    pool: &PgPool,
    principal_id: Uuid,
    resource: &ContainerRef,
) -> Result<AccessLevel, AccessError> {
    if principal_id == resource.owner_id {
        return Ok(AccessLevel::Owner);
    }

    let membership = match resource.team_id {
        Some(team_id) => fetch_membership(pool, team_id, principal_id).await?,
        None => None,
    };

    Ok(resolve_access(
        principal_id,
        resource.owner_id,
        membership.as_ref(),
    ))
}

/// Same resolution for a team itself: the creator is its owner, everyone else
/// goes through their membership row.
pub async fn check_team_access(
    pool: &PgPool,
    principal_id: Uuid,
    team_id: Uuid,
    created_by: Uuid,
) -> Result<AccessLevel, AccessError> {
    if principal_id == created_by {
        return Ok(AccessLevel::Owner);
    }
    let membership = fetch_membership(pool, team_id, principal_id).await?;
    Ok(resolve_access(principal_id, created_by, membership.as_ref()))
}

pub async fn fetch_membership(
    pool: &PgPool,
    team_id: Uuid,
    principal_id: Uuid,
) -> Result<Option<MembershipRow>, AccessError> {
    sqlx::query_as::<_, MembershipRow>(
        "SELECT role, status FROM team_members WHERE team_id = $1 AND principal_id = $2",
    )
    .bind(team_id)
    .bind(principal_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AccessError::Unavailable(e.to_string()))
}

/// Load the owner/team view of a container. Missing container is `NotFound`.
pub async fn load_container(
    pool: &PgPool,
    kind: ParentKind,
    id: Uuid,
) -> Result<ContainerRef, ApiError> {
    let sql = format!("SELECT owner_id, team_id FROM {} WHERE id = $1", kind.table());
    let row = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", kind.label())))?;

    Ok(ContainerRef {
        kind,
        id,
        owner_id: row.0,
        team_id: row.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: &str, status: &str) -> MembershipRow {
        MembershipRow {
            role: role.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn owner_match_wins_regardless_of_membership() {
        let p = Uuid::new_v4();
        // Even a team admin row must not demote (or combine with) owner
        let got = resolve_access(p, p, Some(&member("admin", "active")));
        assert_eq!(got, AccessLevel::Owner);
    }

    #[test]
    fn active_membership_maps_role() {
        let p = Uuid::new_v4();
        let owner = Uuid::new_v4();
        assert_eq!(
            resolve_access(p, owner, Some(&member("admin", "active"))),
            AccessLevel::Admin
        );
        assert_eq!(
            resolve_access(p, owner, Some(&member("member", "active"))),
            AccessLevel::Member
        );
    }

    #[test]
    fn inactive_or_pending_membership_is_none() {
        let p = Uuid::new_v4();
        let owner = Uuid::new_v4();
        assert_eq!(
            resolve_access(p, owner, Some(&member("admin", "pending"))),
            AccessLevel::None
        );
        assert_eq!(
            resolve_access(p, owner, Some(&member("member", "inactive"))),
            AccessLevel::None
        );
        assert_eq!(resolve_access(p, owner, None), AccessLevel::None);
    }

    #[test]
    fn levels_are_ordered_by_privilege() {
        assert!(AccessLevel::Owner > AccessLevel::Admin);
        assert!(AccessLevel::Admin > AccessLevel::Member);
        assert!(AccessLevel::Member > AccessLevel::None);
    }
}
