//! flow-client - authenticated paginated client for Taiga-compatible backends
//!
//! Provides:
//! - Password login yielding a session-scoped bearer [`Credential`]
//! - Project lookup by numeric id or slug
//! - Collection fetches that follow the `x-pagination-next` header and keep
//!   partial results when a page fails
//! - Per-item history lookups
//! - Bounded retry with exponential backoff for throttling and gateway errors
//!
//! # Example
//!
//! ```rust,no_run
//! use flow_client::{ClientConfig, ProjectRef, Resource, TaigaClient};
//!
//! # async fn run() -> flow_client::Result<()> {
//! let client = TaigaClient::new(&ClientConfig::default())?;
//! let credential = client.authenticate("user", "password").await?;
//! let project = client.project(&ProjectRef::Id(1), &credential, None).await?;
//! let stories = client
//!     .fetch_all(Resource::UserStories, &[("project", "1".to_string())], &credential, None)
//!     .await;
//! println!("{} stories in {}", stories.records.len(), project["name"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod client;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use client::{continuation_requested, FetchOutcome, StopReason, TaigaClient, PAGINATION_NEXT_HEADER};
pub use error::{ClientError, ErrorKind, Result};
pub use types::{
    normalize_base_url, ClientConfig, Credential, HistoryScope, ProjectRef, Resource, RetryPolicy,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
