// Authenticated session endpoints.

use axum::extract::Extension;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

/// GET /api/auth/whoami
pub async fn whoami(Extension(principal): Extension<AuthPrincipal>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": principal.id,
        "email": principal.email,
        "role": principal.role,
    })))
}

/// POST /api/auth/refresh - re-mint with a fresh expiry. Only reachable with
/// a still-valid token; expired tokens go back through login.
pub async fn refresh(Extension(principal): Extension<AuthPrincipal>) -> ApiResult<Value> {
    let claims = Claims::new(principal.id, principal.email.clone(), principal.role.clone());
    let token = generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal("failed to issue token")
    })?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": config::config().security.jwt_expiry_hours * 3600,
    })))
}
