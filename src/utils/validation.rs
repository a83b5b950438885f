// Input validation utilities

use crate::utils::{KeydeckError, Result};
use url::Url;

/// Require a non-blank value for a named field
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KeydeckError::validation(field, "is required"));
    }
    Ok(())
}

/// Validate that a value parses as an absolute URL
pub fn validate_url(field: &str, value: &str) -> Result<()> {
    Url::parse(value.trim())
        .map(|_| ())
        .map_err(|e| KeydeckError::validation(field, format!("not a valid URL ({})", e)))
}

/// Strip exactly one trailing slash from an endpoint URL
pub fn normalize_endpoint_url(url: &str) -> String {
    let url = url.trim();
    url.strip_suffix('/').unwrap_or(url).to_string()
}
