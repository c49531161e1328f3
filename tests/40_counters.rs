// Database-backed checks that the counter recompute writes the derived
// totals onto the stored container row. Skips when DATABASE_URL is not set.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use flowboard_api::access::counters::recompute_counters;
use flowboard_api::access::ParentKind;

async fn connect() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return Ok(None);
    };
    let pool = PgPool::connect(&url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Some(pool))
}

async fn counters(pool: &PgPool, project_id: Uuid) -> Result<(i32, i32, i32)> {
    let row = sqlx::query_as::<_, (i32, i32, i32)>(
        "SELECT total_tasks, completed_tasks, progress_percentage FROM projects WHERE id = $1",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

#[tokio::test]
async fn recompute_writes_derived_counters_to_the_row() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };

    let owner = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO principals (email, password_digest, name) VALUES ($1, 'x', 'Counter Test') RETURNING id",
    )
    .bind(format!("{}@example.com", Uuid::new_v4().simple()))
    .fetch_one(&pool)
    .await?;
    let project_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO projects (name, owner_id) VALUES ('Counted', $1) RETURNING id",
    )
    .bind(owner)
    .fetch_one(&pool)
    .await?;

    // No stages or tasks yet: everything zero, no division error
    recompute_counters(&pool, ParentKind::Project, project_id).await?;
    assert_eq!(counters(&pool, project_id).await?, (0, 0, 0));

    let stage_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO stages (project_id, name, position) VALUES ($1, 'Build', 1) RETURNING id",
    )
    .bind(project_id)
    .fetch_one(&pool)
    .await?;
    for status in ["completed", "completed", "todo"] {
        sqlx::query("INSERT INTO tasks (stage_id, title, status) VALUES ($1, 'T', $2)")
            .bind(stage_id)
            .bind(status)
            .execute(&pool)
            .await?;
    }

    // 2 of 3 done rounds to 67
    recompute_counters(&pool, ParentKind::Project, project_id).await?;
    assert_eq!(counters(&pool, project_id).await?, (3, 2, 67));

    sqlx::query("UPDATE tasks SET status = 'completed' WHERE stage_id = $1")
        .bind(stage_id)
        .execute(&pool)
        .await?;
    recompute_counters(&pool, ParentKind::Project, project_id).await?;
    assert_eq!(counters(&pool, project_id).await?, (3, 3, 100));

    // Rerunning without changes is a no-op, not an accumulation
    recompute_counters(&pool, ParentKind::Project, project_id).await?;
    assert_eq!(counters(&pool, project_id).await?, (3, 3, 100));

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM principals WHERE id = $1")
        .bind(owner)
        .execute(&pool)
        .await?;
    Ok(())
}
