//! Issue classification breakdowns

use crate::item::Item;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issue counts per classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBreakdown {
    /// Count per issue type
    pub by_type: BTreeMap<String, usize>,
    /// Count per severity
    pub by_severity: BTreeMap<String, usize>,
    /// Count per priority
    pub by_priority: BTreeMap<String, usize>,
}

/// Break issues down by type, severity and priority; other kinds are ignored
#[must_use]
pub fn issue_breakdown(items: &[Item]) -> IssueBreakdown {
    let mut breakdown = IssueBreakdown::default();
    for item in items {
        let Some((issue_type, severity)) = item.issue_classification() else {
            continue;
        };
        *breakdown.by_type.entry(issue_type.to_string()).or_default() += 1;
        *breakdown.by_severity.entry(severity.to_string()).or_default() += 1;
        *breakdown
            .by_priority
            .entry(item.priority_name().to_string())
            .or_default() += 1;
    }
    breakdown
}
