// Input validation utilities
//
// Local checks that run before anything is dispatched to the backend. Failures are input
// errors shown inline next to the offending field.

use crate::api::backend::ReleaseSummary;
use crate::models::session::Locale;
use crate::wizard::error::WizardError;
use crate::wizard::messages;
use std::path::Path;

/// Extension used in archive messages when the path has none.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "snrdata";

/// Trimmed, non-empty value or an input error with `message`.
pub fn require_non_empty<'a>(value: &'a str, message: &str) -> Result<&'a str, WizardError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WizardError::input(message));
    }
    Ok(trimmed)
}

/// Installation paths must be non-empty and must not contain NUL bytes.
pub fn validate_install_path(path: &str, locale: Locale) -> Result<String, WizardError> {
    let trimmed = require_non_empty(path, messages::install_path_required(locale))?;
    if trimmed.contains('\0') {
        return Err(WizardError::input(messages::install_path_required(locale)));
    }
    Ok(trimmed.to_string())
}

/// The tag must name one of the listed releases.
pub fn validate_release_tag(
    tag: &str,
    releases: &[ReleaseSummary],
    locale: Locale,
) -> Result<String, WizardError> {
    let trimmed = require_non_empty(tag, messages::release_required(locale))?;
    if !releases.iter().any(|r| r.tag == trimmed) {
        return Err(WizardError::input(messages::release_unknown(locale, trimmed)));
    }
    Ok(trimmed.to_string())
}

/// Lowercased archive extension without the dot.
pub fn archive_extension(path: &str) -> String {
    Path::new(path.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_EXTENSION.to_string())
}
