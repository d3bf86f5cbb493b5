use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error code the service uses to flag an upstream timeout on a 4xx response
pub const TIMEOUT_ERROR_CODE: &str = "timeout";

/// Error code for input rejected before any request is sent
pub const INVALID_INPUT_ERROR_CODE: &str = "invalid_input";

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// 4xx (or other non-5xx failure) response; never retried
    ClientError,
    /// 5xx response or an undecodable success body
    ServerError,
    /// The attempt exceeded its deadline
    Timeout,
    /// No response at all (connect or transport failure)
    Network,
    /// The caller cancelled the request
    Cancelled,
}

impl RequestErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestErrorKind::ClientError => "client_error",
            RequestErrorKind::ServerError => "server_error",
            RequestErrorKind::Timeout => "timeout",
            RequestErrorKind::Network => "network",
            RequestErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified request failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
    pub error_code: Option<String>,
}

/// JSON error body returned by the service
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
    code: Option<String>,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            error_code: None,
        }
    }

    pub fn timeout(timeout_ms: u128) -> Self {
        Self::new(
            RequestErrorKind::Timeout,
            format!("Request timed out after {} ms", timeout_ms),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(RequestErrorKind::Cancelled, "Request was cancelled")
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            error_code: Some(INVALID_INPUT_ERROR_CODE.to_string()),
            ..Self::new(RequestErrorKind::ClientError, message)
        }
    }

    /// Classify a transport-level failure (no usable response)
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(RequestErrorKind::Timeout, format!("Request timed out: {}", err))
        } else {
            Self::new(RequestErrorKind::Network, format!("Network error: {}", err))
        }
    }

    /// Classify a non-success HTTP response from its status and raw body.
    ///
    /// The message comes from the body's `detail` or `message` field; when
    /// the body is not a structured error, the status text is used instead.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let (message, error_code) = match parsed {
            Some(body) => {
                let detail = body.detail.and_then(|d| match d {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                });
                (detail.or(body.message), body.code)
            }
            None => (None, None),
        };
        let message = message.unwrap_or_else(|| status_text(status));

        // Only 5xx is a server fault; 4xx and unfollowed 1xx/3xx statuses
        // will not change on retry
        let kind = if error_code.as_deref() == Some(TIMEOUT_ERROR_CODE) {
            RequestErrorKind::Timeout
        } else if status.is_server_error() {
            RequestErrorKind::ServerError
        } else {
            RequestErrorKind::ClientError
        };

        Self {
            kind,
            message,
            status_code: Some(status.as_u16()),
            error_code,
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RequestErrorKind::ServerError | RequestErrorKind::Timeout | RequestErrorKind::Network
        )
    }

    /// Message suitable for showing to the user once retries are exhausted
    pub fn user_message(&self) -> String {
        match self.kind {
            RequestErrorKind::Timeout => {
                "The study service took too long to respond. Please try again.".to_string()
            }
            RequestErrorKind::Network => {
                format!("Could not reach the study service ({})", self.message)
            }
            RequestErrorKind::Cancelled => "Request cancelled".to_string(),
            RequestErrorKind::ClientError | RequestErrorKind::ServerError => self.message.clone(),
        }
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
