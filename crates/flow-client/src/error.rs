//! Error types for the Taiga client
//!
//! Every failure maps onto one of four categories surfaced to callers:
//! - Auth: login rejected, token missing or token refused
//! - NotFound: the referenced resource does not exist
//! - Transport: DNS, TLS, timeouts, other unexpected statuses, deadlines
//! - Parse: bodies that are not the expected JSON

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category shown to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Authentication failed
    Auth,
    /// Resource missing
    NotFound,
    /// Network or server failure
    Transport,
    /// Unexpected payload
    Parse,
}

impl ErrorKind {
    /// Category name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transport => "transport",
            ErrorKind::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Login answered with a non-success status
    #[error("authentication rejected by {url} (status {status})")]
    AuthRejected {
        /// Request URL
        url: String,
        /// HTTP status
        status: u16,
    },

    /// Login succeeded but returned no token
    #[error("authentication response did not contain an auth_token")]
    MissingToken,

    /// Resource does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up
        resource: String,
    },

    /// Unexpected HTTP status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Request URL
        url: String,
        /// HTTP status
        status: u16,
    },

    /// Request could not be completed
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying error
        #[source]
        source: reqwest::Error,
    },

    /// Body was not the expected JSON
    #[error("invalid response from {url}: {message}")]
    Decode {
        /// Request URL
        url: String,
        /// What was wrong
        message: String,
    },

    /// Base URL cannot be used
    #[error("invalid base URL {0:?}")]
    InvalidUrl(String),

    /// Cycle deadline passed before the request completed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ClientError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthRejected { .. } | Self::MissingToken => ErrorKind::Auth,
            Self::Status {
                status: 401 | 403, ..
            } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Status { .. }
            | Self::Transport { .. }
            | Self::InvalidUrl(_)
            | Self::DeadlineExceeded => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Parse,
        }
    }

    /// Check if the request may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Create transport error
    #[inline]
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Create decode error
    #[inline]
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
