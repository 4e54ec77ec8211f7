//! API error types

use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the booking backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status
    #[error("API error: {status} - {message}")]
    Status { status: StatusCode, message: String },

    /// The request never got a response
    #[error("Failed to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected shape
    #[error("Failed to parse response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A success response without the field the operation returns
    #[error("{0}")]
    Rejected(String),

    /// No session configured for an authenticated call
    #[error("Not signed in: {0} is not set")]
    MissingSession(&'static str),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401/403, the token needs replacing
    pub fn is_auth(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
