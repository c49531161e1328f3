//! Boundary validation helpers. Every payload check reports through the
//! `Invalid` error kind with field-level detail instead of ad hoc presence
//! checks per route.

use serde::Deserialize;

use crate::config;
use crate::error::ApiError;

/// Required string field: trimmed, non-empty.
pub fn non_empty(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(
            "validation failed",
            field,
            "must not be empty",
        ));
    }
    Ok(trimmed.to_string())
}

pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::invalid_field(
            "validation failed",
            field,
            &format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

/// Enumerated string field.
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String, ApiError> {
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(ApiError::invalid_field(
            "validation failed",
            field,
            &format!("must be one of: {}", allowed.join(", ")),
        ))
    }
}

/// Optional enumerated field; `None` passes through untouched.
pub fn optional_one_of(
    field: &str,
    value: Option<&str>,
    allowed: &[&str],
) -> Result<Option<String>, ApiError> {
    match value {
        Some(v) => Ok(Some(one_of(field, v, allowed)?)),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Clamp client paging to the configured bounds.
pub fn page_bounds(query: &PageQuery) -> (i64, i64) {
    let api = &config::config().api;
    let limit = query
        .limit
        .unwrap_or(api.default_page_size)
        .clamp(1, api.max_page_size);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty("name", "  Alpha ").unwrap(), "Alpha");
        assert!(non_empty("name", "   ").is_err());
    }

    #[test]
    fn one_of_rejects_unknown_values() {
        assert!(one_of("status", "active", &["planning", "active"]).is_ok());
        let err = one_of("status", "started", &["planning", "active"]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID");
    }

    #[test]
    fn optional_one_of_passes_none() {
        assert_eq!(optional_one_of("status", None, &["a"]).unwrap(), None);
    }

    #[test]
    fn page_bounds_clamps() {
        let (limit, offset) = page_bounds(&PageQuery {
            limit: Some(10_000),
            offset: Some(-5),
        });
        assert!(limit <= config::config().api.max_page_size);
        assert_eq!(offset, 0);
    }
}
