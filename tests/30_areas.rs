// Database-backed checks for the area guards. These run only when
// DATABASE_URL points at a reachable Postgres; otherwise they skip.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use flowboard_api::access::guard::{ensure_area_name_available, ensure_area_unreferenced};

async fn connect() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return Ok(None);
    };
    let pool = PgPool::connect(&url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Some(pool))
}

#[tokio::test]
async fn area_name_check_is_case_insensitive() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };

    // Unique base name so parallel runs cannot collide
    let base = format!("Engineering-{}", Uuid::new_v4().simple());
    let area_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO areas (name) VALUES ($1) RETURNING id",
    )
    .bind(&base)
    .fetch_one(&pool)
    .await?;

    // A case-differing duplicate must read as taken
    let err = ensure_area_name_available(&pool, &base.to_uppercase(), None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    // The row itself is excluded when renaming in place
    ensure_area_name_available(&pool, &base.to_uppercase(), Some(area_id)).await?;

    // An unrelated name passes
    ensure_area_name_available(&pool, &format!("Ops-{}", Uuid::new_v4().simple()), None).await?;

    sqlx::query("DELETE FROM areas WHERE id = $1")
        .bind(area_id)
        .execute(&pool)
        .await?;
    Ok(())
}

#[tokio::test]
async fn referenced_area_refuses_delete_and_rows_survive() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };

    let owner = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO principals (email, password_digest, name) VALUES ($1, 'x', 'Area Test') RETURNING id",
    )
    .bind(format!("{}@example.com", Uuid::new_v4().simple()))
    .fetch_one(&pool)
    .await?;
    let project_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO projects (name, owner_id) VALUES ('Tagged', $1) RETURNING id",
    )
    .bind(owner)
    .fetch_one(&pool)
    .await?;
    let area_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO areas (name) VALUES ($1) RETURNING id",
    )
    .bind(format!("Tag-{}", Uuid::new_v4().simple()))
    .fetch_one(&pool)
    .await?;
    sqlx::query("INSERT INTO project_areas (project_id, area_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(area_id)
        .execute(&pool)
        .await?;

    let err = ensure_area_unreferenced(&pool, area_id).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    // The refusal must leave both the area and the association intact
    let area_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM areas WHERE id = $1")
        .bind(area_id)
        .fetch_one(&pool)
        .await?;
    let link_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM project_areas WHERE area_id = $1")
            .bind(area_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(area_count, 1);
    assert_eq!(link_count, 1);

    // After the association goes away the delete guard passes
    sqlx::query("DELETE FROM project_areas WHERE area_id = $1")
        .bind(area_id)
        .execute(&pool)
        .await?;
    ensure_area_unreferenced(&pool, area_id).await?;

    sqlx::query("DELETE FROM areas WHERE id = $1")
        .bind(area_id)
        .execute(&pool)
        .await?;
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
