//! flow-core - work item model and flow analytics
//!
//! The analytics half of flowlens:
//! - Normalizes raw backend records into typed [`Item`]s
//! - Ranks project statuses into per-kind ordinal maps
//! - Filters items with independent, order-insensitive predicates
//! - Computes status distribution, WIP, aging, cycle time, throughput,
//!   issue breakdowns and flowback rate
//!
//! # Architecture
//!
//! ```text
//! raw JSON → normalize → Vec<Item> → filter::apply → MetricsEngine::compute → FlowMetrics
//!                ↑                                         ↑
//!          ProjectCatalog                         WorkflowVocabulary + history
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use flow_core::{MetricsEngine, StatusOrdinalMap, WorkflowVocabulary};
//!
//! let vocabulary = WorkflowVocabulary::default();
//! let ordinals = StatusOrdinalMap::new();
//! let metrics = MetricsEngine::new(&vocabulary, &ordinals).compute(&[], &[], Utc::now());
//! assert_eq!(metrics.throughput, 0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod catalog;
pub mod error;
pub mod filter;
pub mod history;
pub mod item;
pub mod metrics;
pub mod normalize;
pub mod vocabulary;

// Re-exports for convenience
pub use catalog::{Definition, ProjectCatalog, ProjectRecord, ProjectSummary, StatusOrdinalMap, StatusRef};
pub use error::ParseError;
pub use filter::{Predicate, PredicateSet};
pub use history::{parse_history, HistoryEvent, StatusTransition};
pub use item::{Item, ItemId, ItemKind, Milestone, Variant, NOT_AVAILABLE, UNASSIGNED};
pub use metrics::{FlowMetrics, MetricsEngine};
pub use normalize::{normalize, normalize_all, DataQualityIssue, Normalized, NormalizedBatch};
pub use vocabulary::WorkflowVocabulary;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
