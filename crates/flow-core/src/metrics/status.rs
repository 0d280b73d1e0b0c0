//! Status distribution and work-in-progress

use crate::item::{Item, ItemKind};
use crate::vocabulary::WorkflowVocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status name -> item count
pub type StatusCounts = BTreeMap<String, usize>;

/// Count items per status name
#[must_use]
pub fn status_counts(items: &[Item]) -> StatusCounts {
    let mut counts = StatusCounts::new();
    for item in items {
        *counts.entry(item.status_name.clone()).or_default() += 1;
    }
    counts
}

/// Count items per status name, separately for each kind present
#[must_use]
pub fn status_counts_by_kind(items: &[Item]) -> BTreeMap<ItemKind, StatusCounts> {
    let mut counts: BTreeMap<ItemKind, StatusCounts> = BTreeMap::new();
    for item in items {
        *counts
            .entry(item.kind())
            .or_default()
            .entry(item.status_name.clone())
            .or_default() += 1;
    }
    counts
}

/// Item count per kind; every kind is present, possibly with zero
#[must_use]
pub fn totals_by_kind(items: &[Item]) -> BTreeMap<ItemKind, usize> {
    let mut totals: BTreeMap<ItemKind, usize> = ItemKind::ALL.iter().map(|k| (*k, 0)).collect();
    for item in items {
        *totals.entry(item.kind()).or_default() += 1;
    }
    totals
}

/// Items currently in a WIP status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipAnalysis {
    /// Number of WIP items
    pub count: usize,
    /// WIP items per status name
    pub count_by_status: StatusCounts,
}

/// Analyse work in progress against the configured WIP statuses
#[must_use]
pub fn wip(items: &[Item], vocabulary: &WorkflowVocabulary) -> WipAnalysis {
    let mut analysis = WipAnalysis::default();
    for item in items.iter().filter(|i| vocabulary.is_wip(&i.status_name)) {
        analysis.count += 1;
        *analysis
            .count_by_status
            .entry(item.status_name.clone())
            .or_default() += 1;
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Variant;
    use pretty_assertions::assert_eq;

    fn with_status(id: i64, variant: Variant, status: &str) -> Item {
        Item::new(id, variant, "x").with_status(id, status, None)
    }

    #[test]
    fn wip_counts_configured_statuses() {
        let items = vec![
            with_status(1, Variant::Task, "Doing"),
            with_status(2, Variant::Task, "Doing"),
            with_status(3, Variant::Task, "Done"),
        ];
        let vocab = WorkflowVocabulary::new(["Doing"], ["Done"]);
        let analysis = wip(&items, &vocab);
        assert_eq!(analysis.count, 2);
        assert_eq!(
            analysis.count_by_status,
            StatusCounts::from([("Doing".to_string(), 2)])
        );
    }

    #[test]
    fn status_counts_include_unresolved_statuses() {
        let items = vec![
            with_status(1, Variant::Story, "New"),
            Item::new(2, Variant::Story, "no status"),
            with_status(3, Variant::Task, "New"),
        ];
        let counts = status_counts(&items);
        assert_eq!(counts["New"], 2);
        assert_eq!(counts["N/A"], 1);

        let by_kind = status_counts_by_kind(&items);
        assert_eq!(by_kind[&ItemKind::Story]["New"], 1);
        assert_eq!(by_kind[&ItemKind::Task]["New"], 1);
        assert!(!by_kind.contains_key(&ItemKind::Issue));
    }

    #[test]
    fn totals_list_every_kind() {
        let totals = totals_by_kind(&[with_status(1, Variant::Task, "New")]);
        assert_eq!(totals[&ItemKind::Task], 1);
        assert_eq!(totals[&ItemKind::Story], 0);
        assert_eq!(totals[&ItemKind::Issue], 0);
    }

    #[test]
    fn empty_input_yields_empty_results() {
        assert!(status_counts(&[]).is_empty());
        assert!(status_counts_by_kind(&[]).is_empty());
        assert_eq!(wip(&[], &WorkflowVocabulary::default()), WipAnalysis::default());
    }
}
