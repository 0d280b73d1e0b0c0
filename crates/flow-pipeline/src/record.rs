//! Output of one refresh cycle

use chrono::{DateTime, Utc};
use flow_client::{ErrorKind, Resource};
use flow_core::{DataQualityIssue, FlowMetrics, Item, Milestone, PredicateSet, ProjectSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data source of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// User story collection
    UserStories,
    /// Task collection
    Tasks,
    /// Issue collection
    Issues,
    /// Milestone collection
    Milestones,
    /// Per-item history
    History,
}

impl From<Resource> for Source {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::UserStories => Source::UserStories,
            Resource::Tasks => Source::Tasks,
            Resource::Issues => Source::Issues,
            Resource::Milestones => Source::Milestones,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::UserStories => "user stories",
            Source::Tasks => "tasks",
            Source::Issues => "issues",
            Source::Milestones => "milestones",
            Source::History => "history",
        };
        f.write_str(name)
    }
}

/// A source that failed without failing the cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWarning {
    /// Affected source
    pub source: Source,
    /// Error category
    pub category: ErrorKind,
    /// Error description
    pub message: String,
    /// Records obtained from the source before it failed
    pub records_collected: usize,
}

/// Everything the presentation layer needs from one cycle
///
/// Immutable once produced; shared as `Arc<MetricsRecord>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Project identity
    pub project: ProjectSummary,
    /// Filters the record was computed with
    pub filters: PredicateSet,
    /// Computed analytics over the filtered items
    pub metrics: FlowMetrics,
    /// Filtered items
    pub items: Vec<Item>,
    /// Project milestones
    pub milestones: Vec<Milestone>,
    /// Degraded sources
    pub warnings: Vec<SourceWarning>,
    /// Per-record data problems
    pub data_quality: Vec<DataQualityIssue>,
    /// Whether any source failed or the deadline cut the fetch short
    pub partial: bool,
}

impl MetricsRecord {
    /// Reference instant of the metrics
    #[inline]
    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.metrics.generated_at
    }

    /// Warning for `source`, if it degraded
    #[must_use]
    pub fn warning(&self, source: Source) -> Option<&SourceWarning> {
        self.warnings.iter().find(|w| w.source == source)
    }
}
