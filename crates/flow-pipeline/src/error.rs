//! Error types for flow-pipeline
//!
//! Configuration problems are reported before any request is made. Cycle
//! errors are the fatal failures of a refresh; degraded sources are not
//! errors and surface as warnings on the record instead.

use flow_client::{ClientError, ErrorKind};
use flow_core::ParseError;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::FlowConfig`]
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Required setting absent
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// Setting present but unusable
    #[error("invalid setting {field}: {message}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// What is wrong
        message: String,
    },

    /// HTTP client could not be built from the settings
    #[error("cannot build client: {0}")]
    Client(#[from] ClientError),
}

impl ConfigError {
    /// Create invalid-setting error
    #[inline]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Fatal refresh cycle error
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Login failed, including an unreachable auth endpoint
    #[error("authentication failed: {0}")]
    Authentication(#[source] ClientError),

    /// Project could not be fetched
    #[error("project lookup failed: {0}")]
    Project(#[source] ClientError),

    /// Project payload could not be understood
    #[error("malformed project metadata: {0}")]
    ProjectMetadata(#[from] ParseError),

    /// Cycle deadline passed before the project was resolved
    #[error("cycle deadline of {secs}s exceeded before the project was resolved")]
    DeadlineExceeded {
        /// Configured deadline
        secs: u64,
    },
}

impl CycleError {
    /// Category shown to the user
    #[must_use]
    pub fn category(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Auth,
            Self::Project(e) => e.kind(),
            Self::ProjectMetadata(_) => ErrorKind::Parse,
            Self::DeadlineExceeded { .. } => ErrorKind::Transport,
        }
    }
}
