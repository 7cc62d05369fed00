//! Client-side form validation
//!
//! Checks run before a mutation or analysis request is sent, so obviously
//! bad input gets an inline message instead of a round trip.

use crate::api::{AnalysisKind, MemberRole};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

const MAX_NAME_CHARS: usize = 64;
const MIN_SLUG_CHARS: usize = 3;
const MAX_SLUG_CHARS: usize = 48;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Validated<T> = Result<T, ValidationError>;

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    pattern(cell, source).is_some_and(|re| re.is_match(value))
}

fn required<'a>(field: &'static str, value: &'a str) -> Validated<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(trimmed)
}

fn bounded_name(field: &'static str, value: &str) -> Validated<String> {
    let name = required(field, value)?;
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::new(field, "contains control characters"));
    }
    Ok(name.to_string())
}

pub fn organization_name(value: &str) -> Validated<String> {
    bounded_name("name", value)
}

pub fn project_name(value: &str) -> Validated<String> {
    bounded_name("project name", value)
}

/// Lowercase letters, digits and single hyphens, not at either end.
pub fn slug(value: &str) -> Validated<String> {
    static SLUG: OnceLock<Option<Regex>> = OnceLock::new();
    let slug = required("slug", value)?;
    let len = slug.chars().count();
    if !(MIN_SLUG_CHARS..=MAX_SLUG_CHARS).contains(&len) {
        return Err(ValidationError::new(
            "slug",
            format!(
                "must be {} to {} characters",
                MIN_SLUG_CHARS, MAX_SLUG_CHARS
            ),
        ));
    }
    if !matches(&SLUG, r"^[a-z0-9]+(-[a-z0-9]+)*$", slug) {
        return Err(ValidationError::new(
            "slug",
            "use lowercase letters, digits and single hyphens",
        ));
    }
    Ok(slug.to_string())
}

/// Suggest a slug for an organization name.
pub fn slugify(name: &str) -> String {
    let mut out = String::new();
    let mut pending_hyphen = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out.chars().take(MAX_SLUG_CHARS).collect::<String>().trim_end_matches('-').to_string()
}

pub fn email(value: &str) -> Validated<String> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    let email = required("email", value)?;
    if !matches(&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$", email) {
        return Err(ValidationError::new("email", "is not a valid address"));
    }
    Ok(email.to_lowercase())
}

pub fn role(value: &str) -> Validated<MemberRole> {
    let raw = required("role", value)?;
    MemberRole::parse(raw)
        .ok_or_else(|| ValidationError::new("role", "must be owner, admin or member"))
}

/// Instagram usernames: up to 30 letters, digits, periods or underscores.
pub fn instagram_handle(value: &str) -> Validated<String> {
    static HANDLE: OnceLock<Option<Regex>> = OnceLock::new();
    let handle = required("handle", value)?.trim_start_matches('@');
    if !matches(&HANDLE, r"^[A-Za-z0-9._]{1,30}$", handle)
        || handle.starts_with('.')
        || handle.ends_with('.')
    {
        return Err(ValidationError::new("handle", "is not a valid Instagram handle"));
    }
    Ok(handle.to_lowercase())
}

/// X handles: up to 15 letters, digits or underscores.
pub fn x_handle(value: &str) -> Validated<String> {
    static HANDLE: OnceLock<Option<Regex>> = OnceLock::new();
    let handle = required("handle", value)?.trim_start_matches('@');
    if !matches(&HANDLE, r"^[A-Za-z0-9_]{1,15}$", handle) {
        return Err(ValidationError::new("handle", "is not a valid X handle"));
    }
    Ok(handle.to_string())
}

/// App Store numeric id (optionally `id` prefixed), Android package name,
/// or a store URL.
pub fn app_identifier(value: &str) -> Validated<String> {
    static APPLE_ID: OnceLock<Option<Regex>> = OnceLock::new();
    static PACKAGE: OnceLock<Option<Regex>> = OnceLock::new();
    let raw = required("app", value)?;

    if raw.starts_with("http://") || raw.starts_with("https://") {
        let url = url::Url::parse(raw)
            .map_err(|_| ValidationError::new("app", "is not a valid URL"))?;
        let host = url.host_str().unwrap_or_default();
        if host.ends_with("apps.apple.com") || host.ends_with("play.google.com") {
            return Ok(raw.to_string());
        }
        return Err(ValidationError::new(
            "app",
            "URL must point to the App Store or Google Play",
        ));
    }
    if matches(&APPLE_ID, r"^(id)?[0-9]{6,12}$", raw) {
        return Ok(raw.trim_start_matches("id").to_string());
    }
    if matches(&PACKAGE, r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$", raw) {
        return Ok(raw.to_string());
    }
    Err(ValidationError::new(
        "app",
        "enter an App Store id, a package name (com.example.app) or a store URL",
    ))
}

/// Validate and normalize the target of an analyzer.
pub fn analysis_target(kind: AnalysisKind, value: &str) -> Validated<String> {
    match kind {
        AnalysisKind::Instagram => instagram_handle(value),
        AnalysisKind::X => x_handle(value),
        AnalysisKind::MobileApp => app_identifier(value),
        AnalysisKind::Strategy => bounded_name("target", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(organization_name("  Acme Inc ").unwrap(), "Acme Inc");
        assert!(organization_name("   ").is_err());
        assert!(project_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_slug_rules() {
        assert_eq!(slug("acme-labs").unwrap(), "acme-labs");
        assert!(slug("ab").is_err());
        assert!(slug("Acme").is_err());
        assert!(slug("acme--labs").is_err());
        assert!(slug("-acme").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Acme Labs, Inc. "), "acme-labs-inc");
        assert_eq!(slugify("Café 2024"), "caf-2024");
        assert!(slug(&slugify("Acme Labs")).is_ok());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Ana@Example.com ").unwrap(), "ana@example.com");
        assert!(email("ana@example").is_err());
        assert!(email("ana example.com").is_err());
        let err = email("").unwrap_err();
        assert_eq!(err.to_string(), "email: is required");
    }

    #[test]
    fn test_role() {
        assert_eq!(role("Admin").unwrap(), MemberRole::Admin);
        assert!(role("viewer").is_err());
    }

    #[test]
    fn test_handles() {
        assert_eq!(instagram_handle("@Acme.Labs").unwrap(), "acme.labs");
        assert!(instagram_handle("acme labs").is_err());
        assert!(instagram_handle(".acme").is_err());
        assert_eq!(x_handle("@acme_hq").unwrap(), "acme_hq");
        assert!(x_handle("this_handle_is_too_long").is_err());
    }

    #[test]
    fn test_app_identifier() {
        assert_eq!(app_identifier("id1234567890").unwrap(), "1234567890");
        assert_eq!(app_identifier("com.acme.app").unwrap(), "com.acme.app");
        assert!(app_identifier("https://apps.apple.com/us/app/acme/id123456").is_ok());
        assert!(app_identifier("https://example.com/app").is_err());
        assert!(app_identifier("acme").is_err());
    }

    #[test]
    fn test_analysis_target_dispatch() {
        assert!(analysis_target(AnalysisKind::X, "@acme").is_ok());
        assert!(analysis_target(AnalysisKind::MobileApp, "@acme").is_err());
    }
}
