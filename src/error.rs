// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Closed error taxonomy for the HTTP boundary.
///
/// Every handler and middleware maps its outcome into one of these variants;
/// nothing else ever reaches the wire. `Unavailable` (backing store down) is
/// deliberately distinct from `Forbidden`/`NotFound` so an outage is never
/// reported as an authorization failure.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request - payload fails schema validation
    Invalid {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized - no credential, or an invalid/expired one (never
    // distinguished in the response)
    Unauthenticated(String),

    // 403 Forbidden - authenticated but insufficient access level
    Forbidden(String),

    // 404 Not Found - missing resource, or a nested resource that does not
    // belong to the claimed parent (conflated on purpose)
    NotFound(String),

    // 409 Conflict - uniqueness violation or delete blocked by references
    Conflict(String),

    // 500 Internal Server Error
    Internal(String),

    // 503 Service Unavailable - backing store unreachable
    Unavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Invalid { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-safe message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Invalid { message, .. } => message,
            ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg)
            | ApiError::Unavailable(msg) => msg,
        }
    }

    /// Stable machine-readable code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Invalid { .. } => "INVALID",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
            ApiError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// JSON body in the shared envelope shape:
    /// `{ "success": false, "error": CODE, "message": ..., "field_errors"? }`
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.error_code(),
            "message": self.message(),
        });
        if let ApiError::Invalid {
            field_errors: Some(fields),
            ..
        } = self
        {
            body["field_errors"] = json!(fields);
        }
        body
    }
}

// Constructors, mirroring the variants
impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn invalid_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, String>,
    ) -> Self {
        ApiError::Invalid {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    pub fn invalid_field(message: impl Into<String>, field: &str, detail: &str) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), detail.to_string());
        Self::invalid_fields(message, field_errors)
    }

    pub fn unauthenticated() -> Self {
        // One fixed message for every credential failure shape
        ApiError::Unauthenticated("authentication required".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Unavailable(message.into())
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("missing configuration: {}", name);
                ApiError::unavailable("database not configured")
            }
            DatabaseError::Sqlx(e) => sqlx_to_api(e),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        sqlx_to_api(err)
    }
}

fn sqlx_to_api(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::not_found("not found"),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            ApiError::unavailable("database temporarily unavailable")
        }
        e => {
            // Log the real error, return a generic message
            tracing::error!("sqlx error: {}", e);
            ApiError::internal("an error occurred while processing your request")
        }
    }
}

impl From<crate::access::AccessError> for ApiError {
    fn from(err: crate::access::AccessError) -> Self {
        match err {
            crate::access::AccessError::Unavailable(msg) => {
                tracing::error!("access lookup unavailable: {}", msg);
                ApiError::unavailable("database temporarily unavailable")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::unauthenticated().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::unavailable("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn envelope_shape_is_uniform() {
        let body = ApiError::conflict("area name already exists").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "CONFLICT");
        assert_eq!(body["message"], "area name already exists");
        assert!(body.get("field_errors").is_none());
    }

    #[test]
    fn invalid_carries_field_errors() {
        let err = ApiError::invalid_field("validation failed", "name", "must not be empty");
        let body = err.to_json();
        assert_eq!(body["error"], "INVALID");
        assert_eq!(body["field_errors"]["name"], "must not be empty");
    }

    #[test]
    fn unauthenticated_message_is_fixed() {
        // Absent and invalid credentials must be indistinguishable
        assert_eq!(ApiError::unauthenticated().message(), "authentication required");
    }
}
