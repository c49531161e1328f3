//! Denormalized counter recomputation for projects and workflows.
//!
//! Counters are always derived from the current task rows in one UPDATE
//! statement, never incremented in place, so concurrent task mutations
//! serialize on the container row and repeated runs are idempotent.

use sqlx::PgPool;
use uuid::Uuid;

use super::{AccessError, ParentKind};

/// Recompute total/completed/progress on the owning container from its task
/// rows. Single statement: the aggregate subquery and the row update happen
/// atomically on the store side.
pub async fn recompute_counters(
    pool: &PgPool,
    kind: ParentKind,
    container_id: Uuid,
) -> Result<(), AccessError> {
    let sql = format!(
        r#"
        UPDATE {table} c
        SET total_tasks = s.total,
            completed_tasks = s.done,
            progress_percentage = CASE WHEN s.total = 0 THEN 0
                ELSE CAST(ROUND(s.done * 100.0 / s.total) AS INT) END,
            updated_at = NOW()
        FROM (
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE t.status = 'completed') AS done
            FROM tasks t
            JOIN stages st ON st.id = t.stage_id
            WHERE st.{scope_column} = $1
        ) s
        WHERE c.id = $1
        "#,
        table = kind.table(),
        scope_column = kind.scope_column(),
    );

    sqlx::query(&sql)
        .bind(container_id)
        .execute(pool)
        .await
        .map_err(|e| AccessError::Unavailable(e.to_string()))?;
    Ok(())
}

/// Post-mutation hook. The primary mutation already succeeded, so a failed
/// recompute is logged and swallowed; the next task mutation rederives the
/// counters from scratch.
pub async fn recompute_after_mutation(pool: &PgPool, kind: ParentKind, container_id: Uuid) {
    if let Err(e) = recompute_counters(pool, kind, container_id).await {
        tracing::warn!(
            "counter recompute failed for {} {}: {}",
            kind.label(),
            container_id,
            e
        );
    }
}

/// Rounding rule shared with the SQL above.
pub fn progress_percentage(completed: i64, total: i64) -> i32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64) * 100.0 / (total as f64)).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tasks_is_zero_percent() {
        // Not NaN, not an error
        assert_eq!(progress_percentage(0, 0), 0);
    }

    #[test]
    fn all_done_is_one_hundred() {
        assert_eq!(progress_percentage(7, 7), 100);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(1, 2), 50);
    }

    #[test]
    fn stays_in_bounds() {
        for done in 0..=10 {
            let pct = progress_percentage(done, 10);
            assert!((0..=100).contains(&pct));
        }
    }
}
