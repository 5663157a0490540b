//! Transport-level error taxonomy for backend calls. Every request made by
//! `BackendClient` fails with exactly one of these variants; the flow-level
//! stage tags in `crate::auth` are mapped from them and never expose raw
//! transport internals to the caller.

use thiserror::Error;

/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

/// How a single backend request failed.
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed or the request was malformed.
    #[error("config error: {0}")]
    Config(String),
    /// The backend was unreachable.
    #[error("unable to reach the server: {0}")]
    Network(String),
    /// The request exceeded the transport timeout.
    #[error("request timed out")]
    Timeout,
    /// The backend answered with a non-success status.
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    /// The response body could not be decoded into the expected record.
    #[error("failed to decode response: {0}")]
    Parse(String),
    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status of the failed request, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn http(status: u16, body: String) -> Self {
        ApiError::Http {
            status,
            message: sanitize_body(body),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else if err.is_builder() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Sanitizes HTTP error bodies for caller-facing messages by trimming and
/// truncating.
fn sanitize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_truncates_long_bodies() {
        let body = "x".repeat(500);
        let err = ApiError::http(500, body);
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), MAX_ERROR_CHARS);
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn http_error_replaces_empty_bodies() {
        let err = ApiError::http(503, "   ".to_string());
        match err {
            ApiError::Http { message, .. } => assert_eq!(message, "Request failed."),
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn status_is_only_set_for_http_errors() {
        assert_eq!(ApiError::http(404, "missing".into()).status(), Some(404));
        assert_eq!(ApiError::Timeout.status(), None);
        assert_eq!(ApiError::Network("down".into()).status(), None);
    }
}
