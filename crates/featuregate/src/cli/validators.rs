//! CLI input validation functions.
//!
//! Used by clap's `value_parser` attribute so bad input is rejected at parse
//! time, before any repository is opened.

use crate::domain::MAX_NAME_LENGTH;

/// Validate a feature ID prefix.
///
/// Delegates to `commands::init::validate_prefix` so both paths share the
/// same rules.
pub fn validate_prefix(s: &str) -> Result<String, String> {
    use crate::commands::init;

    let trimmed = s.trim();
    init::validate_prefix(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Validate a feature ID of the form `prefix-suffix`.
///
/// The prefix follows [`validate_prefix`]; the suffix is one or more ASCII
/// alphanumerics. Examples: `flag-a3f8`, `ff-0z9`.
pub fn validate_feature_id(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Feature ID cannot be empty".to_string());
    }

    let Some((prefix, suffix)) = s.split_once('-') else {
        return Err(format!(
            "Invalid feature ID format: '{s}'. Expected format: prefix-suffix (e.g., flag-a3f8)"
        ));
    };

    validate_prefix(prefix).map_err(|e| format!("Feature ID {}", e.to_lowercase()))?;

    if suffix.is_empty() {
        return Err("Feature ID suffix cannot be empty".to_string());
    }

    if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Feature ID suffix must contain only alphanumeric characters".to_string());
    }

    Ok(s.to_string())
}

/// Validate a feature name: non-empty, single line, at most 200 characters.
pub fn validate_name(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    let len = s.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters, got {len} characters"
        ));
    }

    if let Some(pos) = s.chars().position(char::is_control) {
        return Err(format!("Name contains invalid control character at position {pos}"));
    }

    Ok(s.to_string())
}
