// Public authentication endpoints: token acquisition only. Everything else
// lives behind the identity middleware.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::principal::{Principal, PRINCIPAL_COLUMNS};
use crate::error::ApiError;
use crate::handlers::validate;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// POST /auth/register - create a principal with the default `user` role
pub async fn register(Json(body): Json<RegisterRequest>) -> ApiResult<Principal> {
    let email = validate::non_empty("email", &body.email)?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::invalid_field(
            "validation failed",
            "email",
            "must be a valid email address",
        ));
    }
    let name = validate::non_empty("name", &body.name)?;
    validate::max_len("name", &name, 200)?;
    if body.password.len() < 8 {
        return Err(ApiError::invalid_field(
            "validation failed",
            "password",
            "must be at least 8 characters",
        ));
    }

    let digest = hash_password(&body.password);
    let pool = DatabaseManager::pool().await?;

    let sql = format!(
        "INSERT INTO principals (email, password_digest, name, role) \
         VALUES ($1, $2, $3, 'user') RETURNING {}",
        PRINCIPAL_COLUMNS
    );
    let principal = sqlx::query_as::<_, Principal>(&sql)
        .bind(&email)
        .bind(&digest)
        .bind(&name)
        .fetch_one(&pool)
        .await
        .map_err(|e| crate::access::guard::conflict_on_unique(e, "email already registered"))?;

    Ok(ApiResponse::created(principal))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    password_digest: String,
    is_active: bool,
    deleted_at: Option<DateTime<Utc>>,
}

/// POST /auth/login - verify credentials and mint a bearer token.
///
/// Unknown email, wrong password, and deactivated accounts all produce the
/// identical `Unauthenticated` response.
pub async fn login(Json(body): Json<LoginRequest>) -> ApiResult<Value> {
    let email = body.email.trim().to_lowercase();
    let pool = DatabaseManager::pool().await?;

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, email, name, role, password_digest, is_active, deleted_at \
         FROM principals WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(ApiError::unauthenticated)?;

    if !row.is_active || row.deleted_at.is_some() || !verify_password(&row.password_digest, &body.password)
    {
        return Err(ApiError::unauthenticated());
    }

    let claims = Claims::new(row.id, row.email.clone(), row.role.clone());
    let token = generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal("failed to issue token")
    })?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": config::config().security.jwt_expiry_hours * 3600,
        "principal": {
            "id": row.id,
            "email": row.email,
            "name": row.name,
            "role": row.role,
        }
    })))
}
