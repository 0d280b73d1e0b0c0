//! flow-pipeline - refresh cycles, configuration and result caching
//!
//! Ties the client and the analytics core together:
//! - [`FlowConfig`]: TOML configuration with `TAIGA_*` environment overlay
//! - [`FlowPipeline`]: authenticate, fetch, normalize, filter and compute
//! - [`ResultCache`]: TTL cache with single-flight computation
//! - [`FetchPool`]: bounded concurrency for per-item history requests
//!
//! # Architecture
//!
//! ```text
//! FlowPipeline::metrics(filters)
//!     │ miss
//!     ▼
//! ResultCache::get_or_compute ──▶ run_cycle
//!                                   ├─ authenticate / project   (fatal on failure)
//!                                   ├─ 4 collections in parallel (degrade on failure)
//!                                   ├─ normalize → filter
//!                                   ├─ history via FetchPool     (degrade on failure)
//!                                   └─ MetricsEngine::compute
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod config;
pub mod cycle;
pub mod error;
pub mod pool;
pub mod record;

// Re-exports for convenience
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::{ConnectionConfig, FlowConfig, PipelineSettings, RetrySettings};
pub use cycle::FlowPipeline;
pub use error::{ConfigError, CycleError};
pub use pool::{FetchPool, PoolStats};
pub use record::{MetricsRecord, Source, SourceWarning};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
