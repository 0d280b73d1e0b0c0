//! Deployment-specific workflow vocabulary
//!
//! Which status names count as "work in progress" or "closed" differs per
//! project, so both sets are configuration rather than literals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recognized status names per category
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowVocabulary {
    /// Statuses counted as work in progress
    pub wip_statuses: BTreeSet<String>,
    /// Statuses treated as closed even when the item is not flagged closed
    pub closed_statuses: BTreeSet<String>,
}

impl WorkflowVocabulary {
    /// Create vocabulary from explicit sets
    #[must_use]
    pub fn new<W, C>(wip: W, closed: C) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            wip_statuses: wip.into_iter().map(Into::into).collect(),
            closed_statuses: closed.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `status` is a WIP status
    #[inline]
    #[must_use]
    pub fn is_wip(&self, status: &str) -> bool {
        contains_ignore_case(&self.wip_statuses, status)
    }

    /// Whether `status` is a closed status
    #[inline]
    #[must_use]
    pub fn is_closed(&self, status: &str) -> bool {
        contains_ignore_case(&self.closed_statuses, status)
    }
}

impl Default for WorkflowVocabulary {
    /// Taiga's stock workflow names
    fn default() -> Self {
        Self::new(
            ["In progress", "Ready for test"],
            ["Done", "Closed", "Archived", "Rejected"],
        )
    }
}

/// Whether `set` holds `name`, ignoring ASCII case and surrounding whitespace
pub(crate) fn contains_ignore_case(set: &BTreeSet<String>, name: &str) -> bool {
    let name = name.trim();
    set.iter().any(|s| s.trim().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case_and_padding() {
        let vocab = WorkflowVocabulary::new(["Doing"], ["Done"]);
        assert!(vocab.is_wip("doing"));
        assert!(vocab.is_wip(" DOING "));
        assert!(!vocab.is_wip("Done"));
        assert!(vocab.is_closed("done"));
    }

    #[test]
    fn default_vocabulary_uses_stock_names() {
        let vocab = WorkflowVocabulary::default();
        assert!(vocab.is_wip("In progress"));
        assert!(vocab.is_closed("Closed"));
        assert!(!vocab.is_closed("New"));
    }

    #[test]
    fn partial_toml_style_fields_fall_back_to_defaults() {
        let vocab: WorkflowVocabulary =
            serde_json::from_value(serde_json::json!({"wip_statuses": ["Doing"]})).unwrap();
        assert!(vocab.is_wip("Doing"));
        assert!(vocab.is_closed("Archived"));
    }
}
