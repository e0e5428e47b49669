use thiserror::Error;

/// Outcome of the refresh protocol. `Clone` so every caller waiting on a
/// single in-flight refresh observes the same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("refresh token rejected by server")]
    Rejected,

    #[error("network error during refresh: {0}")]
    Network(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("unauthorized - access token rejected")]
    Unauthorized,

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data in errors
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

/// Flatten a field-error payload (`{"field": ["msg", ...], ...}`) into one
/// user-facing message, all messages concatenated in document order.
pub(crate) fn flatten_field_errors(value: &serde_json::Value) -> String {
    let mut messages = Vec::new();
    collect_messages(value, &mut messages);
    messages.join(" ")
}

fn collect_messages(value: &serde_json::Value, messages: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => messages.push(s.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_messages(item, messages);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_messages(item, messages);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "missing"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "?"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body_limits_length() {
        let long = "x".repeat(2000);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.contains("2000 total bytes"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        // 499 ASCII bytes followed by a multi-byte char straddling the cut
        let body = format!("{}é{}", "x".repeat(499), "y".repeat(100));
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_flatten_field_errors_concatenates_all() {
        let value = serde_json::json!({
            "username": ["A user with that username already exists."],
            "password": ["This password is too short.", "This password is too common."]
        });
        let message = flatten_field_errors(&value);
        assert!(message.contains("already exists"));
        assert!(message.contains("too short"));
        assert!(message.contains("too common"));
    }

    #[test]
    fn test_flatten_field_errors_empty_object() {
        assert_eq!(flatten_field_errors(&serde_json::json!({})), "");
    }
}
