use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result type for commercetools API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the commercetools client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a status error from a non-success response body.
    ///
    /// commercetools answers with an error document
    /// (`{"statusCode", "message", "errors": [{"code", "message"}]}`); when the
    /// body is not one, the raw text becomes the message.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorDocument>(body) {
            Ok(doc) => Self::Status {
                status,
                code: doc.errors.into_iter().next().map(|e| e.code),
                message: doc.message,
            },
            Err(_) => Self::Status {
                status,
                code: None,
                message: if body.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    body.to_string()
                },
            },
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The resource does not exist (anymore).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The version sent with an update or delete no longer matches.
    pub fn is_concurrent_modification(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    message: String,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: String,
}
