//! Errors returned by the backend client

use crate::util::truncate;
use serde_json::Value;
use thiserror::Error;

/// Longest body excerpt kept when the backend gives no usable detail.
const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, TLS or timeout failure before a response arrived
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{status}: {detail}")]
    Status { status: u16, detail: String },

    /// Response body was not the JSON we expected
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a rejected response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = extract_error_detail(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status_reason(status).to_string()
            } else {
                truncate(trimmed, BODY_PREVIEW_CHARS)
            }
        });
        ApiError::Status { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Short message suitable for an inline notice
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(e) if e.is_timeout() => {
                "Request timed out. Press 'r' to retry.".to_string()
            }
            ApiError::Transport(e) if e.is_connect() => {
                "Could not reach the server. Check the API URL and your connection.".to_string()
            }
            ApiError::Transport(e) => format!("Request failed: {}", e),
            ApiError::Status { status: 401, .. } => {
                "Not signed in or token expired. Run 'orgpulse --setup'.".to_string()
            }
            ApiError::Status { status: 403, detail } => {
                format!("Permission denied: {}", detail)
            }
            ApiError::Status { status: 429, .. } => {
                "Rate limited by the server. Try again in a minute.".to_string()
            }
            ApiError::Status { status, detail } => format!("Error {}: {}", status, detail),
            ApiError::Decode(e) => format!("Unexpected response from server: {}", e),
            ApiError::InvalidUrl(e) => format!("Invalid API URL: {}", e),
            ApiError::NotConfigured(what) => format!("Not configured: {}", what),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"detail": "..."}`, `{"message": "..."}`, `{"error": "..."}` and
/// validation lists like `{"detail": [{"loc": [...], "msg": "..."}]}`.
pub fn extract_error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Array(items)) => {
                let messages: Vec<String> = items.iter().filter_map(validation_message).collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            Some(Value::Object(inner)) => {
                if let Some(Value::String(s)) = inner.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }
    None
}

fn validation_message(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let msg = obj.get("msg").and_then(Value::as_str)?;
            let field = obj
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .and_then(Value::as_str);
            Some(match field {
                Some(field) => format!("{}: {}", field, msg),
                None => msg.to_string(),
            })
        }
        _ => None,
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        422 => "Invalid input",
        429 => "Too many requests",
        500..=599 => "Server error",
        _ => "Request rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let detail = extract_error_detail(r#"{"detail": "Organization not found"}"#);
        assert_eq!(detail.as_deref(), Some("Organization not found"));
    }

    #[test]
    fn test_message_field() {
        let detail = extract_error_detail(r#"{"message": "Slug already taken"}"#);
        assert_eq!(detail.as_deref(), Some("Slug already taken"));
    }

    #[test]
    fn test_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "email"], "msg": "value is not a valid email"}]}"#;
        assert_eq!(
            extract_error_detail(body).as_deref(),
            Some("email: value is not a valid email")
        );
    }

    #[test]
    fn test_non_json_body_is_previewed() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
        match err {
            ApiError::Status { status, detail } => {
                assert_eq!(status, 502);
                assert!(detail.contains("Bad Gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_uses_reason() {
        let err = ApiError::from_response(404, "");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "404: Not found");
    }

    #[test]
    fn test_user_message_for_unauthorized() {
        let err = ApiError::from_response(401, r#"{"detail": "Invalid token"}"#);
        assert!(err.user_message().contains("--setup"));
    }
}
