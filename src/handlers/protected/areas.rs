// Area routes. Areas are global tags: creation and deletion are limited to
// platform admin/editor roles, names are unique case-insensitively, and an
// area referenced by any project refuses deletion.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::guard::{
    conflict_on_unique, ensure_area_name_available, ensure_area_unreferenced,
};
use crate::database::manager::DatabaseManager;
use crate::database::models::Area;
use crate::error::ApiError;
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

fn require_curator(principal: &AuthPrincipal) -> Result<(), ApiError> {
    if principal.role == "admin" || principal.role == "editor" {
        Ok(())
    } else {
        Err(ApiError::forbidden("insufficient role to manage areas"))
    }
}

/// GET /api/areas
pub async fn list(Extension(_principal): Extension<AuthPrincipal>) -> ApiResult<Vec<Area>> {
    let pool = DatabaseManager::pool().await?;
    let areas = sqlx::query_as::<_, Area>("SELECT * FROM areas ORDER BY name")
        .fetch_all(&pool)
        .await?;
    Ok(ApiResponse::success(areas))
}

#[derive(Debug, Deserialize)]
pub struct CreateArea {
    pub name: String,
}

/// POST /api/areas
///
/// The pre-check is best effort; the unique index on lower(name) catches a
/// racing insert and still reports `Conflict`.
pub async fn create(
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateArea>,
) -> ApiResult<Area> {
    require_curator(&principal)?;
    let name = validate::non_empty("name", &body.name)?;
    validate::max_len("name", &name, 100)?;

    let pool = DatabaseManager::pool().await?;
    ensure_area_name_available(&pool, &name, None).await?;

    let area = sqlx::query_as::<_, Area>("INSERT INTO areas (name) VALUES ($1) RETURNING *")
        .bind(&name)
        .fetch_one(&pool)
        .await
        .map_err(|e| conflict_on_unique(e, "area name already exists"))?;

    Ok(ApiResponse::created(area))
}

/// DELETE /api/areas/:area_id - refused while any project references it
pub async fn delete(
    Extension(principal): Extension<AuthPrincipal>,
    Path(area_id): Path<Uuid>,
) -> ApiResult<Value> {
    require_curator(&principal)?;

    let pool = DatabaseManager::pool().await?;
    let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM areas WHERE id = $1")
        .bind(area_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("area not found"));
    }

    ensure_area_unreferenced(&pool, area_id).await?;

    sqlx::query("DELETE FROM areas WHERE id = $1")
        .bind(area_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted_id": area_id })))
}
