//! Flow metrics engine
//!
//! Every metric is a pure function of its inputs. The reference instant is
//! supplied by the caller and shared by all computations of one run, so the
//! same inputs and the same `now` always produce the same [`FlowMetrics`].

mod aging;
mod flowback;
mod issues;
mod status;
mod timing;

pub use aging::{aging, is_open, AgingEntry};
pub use flowback::{flowback, flowback_rate, FlowbackSummary};
pub use issues::{issue_breakdown, IssueBreakdown};
pub use status::{
    status_counts, status_counts_by_kind, totals_by_kind, wip, StatusCounts, WipAnalysis,
};
pub use timing::{cycle_times, throughput, THROUGHPUT_WINDOW_DAYS};

use crate::catalog::StatusOrdinalMap;
use crate::history::HistoryEvent;
use crate::item::{Item, ItemKind};
use crate::vocabulary::WorkflowVocabulary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All analytics derived from one item set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    /// Reference instant the metrics were computed against
    pub generated_at: DateTime<Utc>,
    /// Item count per kind
    pub totals: BTreeMap<ItemKind, usize>,
    /// Status distribution over all items
    pub status_counts: StatusCounts,
    /// Status distribution per kind
    pub status_counts_by_kind: BTreeMap<ItemKind, StatusCounts>,
    /// Work in progress
    pub wip: WipAnalysis,
    /// Open items by age, oldest first
    pub aging: Vec<AgingEntry>,
    /// Cycle-time samples in whole days
    pub cycle_times: Vec<i64>,
    /// Items completed in the trailing week
    pub throughput: usize,
    /// Issue classification counts
    pub issues: IssueBreakdown,
    /// Regression rate over status transitions
    pub flowback: FlowbackSummary,
}

/// Computes [`FlowMetrics`] for a fixed vocabulary and ordinal map
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngine<'a> {
    vocabulary: &'a WorkflowVocabulary,
    ordinals: &'a StatusOrdinalMap,
}

impl<'a> MetricsEngine<'a> {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new(vocabulary: &'a WorkflowVocabulary, ordinals: &'a StatusOrdinalMap) -> Self {
        Self {
            vocabulary,
            ordinals,
        }
    }

    /// Compute every metric against the reference instant `now`
    #[must_use]
    pub fn compute(&self, items: &[Item], history: &[HistoryEvent], now: DateTime<Utc>) -> FlowMetrics {
        let metrics = FlowMetrics {
            generated_at: now,
            totals: totals_by_kind(items),
            status_counts: status_counts(items),
            status_counts_by_kind: status_counts_by_kind(items),
            wip: wip(items, self.vocabulary),
            aging: aging(items, self.vocabulary, now),
            cycle_times: cycle_times(items),
            throughput: throughput(items, now),
            issues: issue_breakdown(items),
            flowback: flowback(history, self.ordinals),
        };
        tracing::debug!(
            items = items.len(),
            history_events = history.len(),
            wip = metrics.wip.count,
            throughput = metrics.throughput,
            flowback_rate = metrics.flowback.rate,
            "computed flow metrics"
        );
        metrics
    }
}
