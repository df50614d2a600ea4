//! Error types for the REST client.

use thiserror::Error;

/// Errors produced by [`ApiClient`](super::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: connection refused, reset, timed out, or body read error.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}{}", message_suffix(.message))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable message extracted from the body, if any.
        message: Option<String>,
        /// Parsed JSON body, kept for field-level validation errors.
        body: Option<serde_json::Value>,
    },

    /// A mutating request needed a CSRF token and none was available.
    #[error("CSRF token not found in cookies")]
    CsrfMissing,

    /// Input rejected before any request was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Whether the failure happened below HTTP (no response was received).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::HttpRequest(_))
    }

    /// Message the server put in its error body.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Parsed error body.
    #[must_use]
    pub const fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Build a status error from a raw response body.
    #[must_use]
    pub fn from_status(status: u16, raw_body: &str) -> Self {
        let body = serde_json::from_str::<serde_json::Value>(raw_body).ok();
        let message = body.as_ref().and_then(extract_message);
        Self::Status {
            status,
            message,
            body,
        }
    }
}

/// Pull a readable message out of a Django REST framework error body.
///
/// Looks at `error`, `detail`, `non_field_errors[0]` and `message`, in that order.
#[must_use]
pub fn extract_message(body: &serde_json::Value) -> Option<String> {
    if let Some(text) = body.as_str() {
        return Some(text.to_string());
    }
    for key in ["error", "detail"] {
        if let Some(text) = body.get(key).and_then(serde_json::Value::as_str) {
            return Some(text.to_string());
        }
    }
    if let Some(first) = body
        .get("non_field_errors")
        .and_then(serde_json::Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(serde_json::Value::as_str)
    {
        return Some(first.to_string());
    }
    body.get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Convenience result alias for REST calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_extracts_drf_messages() {
        let err = ApiError::from_status(400, r#"{"error":"Mesaj boş olamaz!"}"#);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), Some("Mesaj boş olamaz!"));

        let err = ApiError::from_status(
            400,
            r#"{"non_field_errors":["Unable to log in with provided credentials."]}"#,
        );
        assert_eq!(
            err.server_message(),
            Some("Unable to log in with provided credentials.")
        );

        let err = ApiError::from_status(403, r#"{"detail":"Authentication credentials were not provided."}"#);
        assert!(err.is_unauthorized());
    }

    #[test]
    fn non_json_body_keeps_status_only() {
        let err = ApiError::from_status(502, "<html>Bad Gateway</html>");
        assert_eq!(err.status(), Some(502));
        assert!(err.server_message().is_none());
        assert!(err.body().is_none());
        assert_eq!(err.to_string(), "server returned 502");
    }

    #[test]
    fn display_includes_server_message() {
        let err = ApiError::from_status(404, r#"{"error":"Robot bulunamadı!"}"#);
        assert_eq!(err.to_string(), "server returned 404: Robot bulunamadı!");
        assert!(!err.is_transport());
    }
}
