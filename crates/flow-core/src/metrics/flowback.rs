//! Flowback (workflow regression) rate

use crate::catalog::StatusOrdinalMap;
use crate::history::HistoryEvent;
use serde::{Deserialize, Serialize};

/// Regressions among status transitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowbackSummary {
    /// Transitions whose endpoints both resolved to an ordinal
    pub transitions: usize,
    /// Resolved transitions moving to an earlier status
    pub regressions: usize,
    /// `100 * regressions / transitions`, or 0 without transitions
    pub rate: f64,
}

/// Compute flowback over `events` using the per-kind ordinal map
///
/// Transitions with an unresolved endpoint count neither as regressions nor
/// towards the total.
#[must_use]
pub fn flowback(events: &[HistoryEvent], ordinals: &StatusOrdinalMap) -> FlowbackSummary {
    let mut summary = FlowbackSummary::default();
    for event in events {
        let Some(transition) = &event.transition else {
            continue;
        };
        let from = ordinals.resolve(event.kind, &transition.from);
        let to = ordinals.resolve(event.kind, &transition.to);
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        summary.transitions += 1;
        if to < from {
            summary.regressions += 1;
        }
    }
    summary.rate = flowback_rate(summary.regressions, summary.transitions);
    summary
}

/// Percentage of regressions, guarding the empty case
#[allow(clippy::cast_precision_loss)]
#[inline]
#[must_use]
pub fn flowback_rate(regressions: usize, transitions: usize) -> f64 {
    if transitions == 0 {
        return 0.0;
    }
    100.0 * regressions as f64 / transitions as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Definition, StatusRef};
    use crate::history::StatusTransition;
    use crate::item::{ItemId, ItemKind};

    fn ordinals() -> StatusOrdinalMap {
        let def = |id, name: &str, order| Definition {
            id,
            name: name.into(),
            order,
            is_closed: false,
        };
        let mut map = StatusOrdinalMap::new();
        map.set_statuses(
            ItemKind::Story,
            &[def(1, "Backlog", 0), def(2, "Ready", 1), def(3, "Doing", 2), def(4, "Done", 3)],
        );
        map
    }

    #[test]
    fn single_regression_is_full_rate() {
        let events = vec![HistoryEvent::status_change(ItemId(1), ItemKind::Story, 4, 1)];
        let summary = flowback(&events, &ordinals());
        assert_eq!(summary.transitions, 1);
        assert_eq!(summary.regressions, 1);
        assert!((summary.rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mixed_transitions() {
        let events = vec![
            HistoryEvent::status_change(ItemId(1), ItemKind::Story, 1, 2),
            HistoryEvent::status_change(ItemId(1), ItemKind::Story, 2, 3),
            HistoryEvent::status_change(ItemId(1), ItemKind::Story, 3, 2),
            HistoryEvent::status_change(ItemId(1), ItemKind::Story, 2, 4),
        ];
        let summary = flowback(&events, &ordinals());
        assert_eq!(summary.transitions, 4);
        assert_eq!(summary.regressions, 1);
        assert!((summary.rate - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unresolved_endpoints_are_excluded() {
        let events = vec![
            HistoryEvent::status_change(ItemId(1), ItemKind::Story, 4, 99),
            // ordinals are per kind: task statuses are unknown here
            HistoryEvent::status_change(ItemId(2), ItemKind::Task, 4, 1),
            HistoryEvent {
                item: ItemId(3),
                kind: ItemKind::Story,
                at: None,
                transition: None,
            },
        ];
        let summary = flowback(&events, &ordinals());
        assert_eq!(summary, FlowbackSummary::default());
    }

    #[test]
    fn name_endpoints_resolve() {
        let events = vec![HistoryEvent {
            item: ItemId(1),
            kind: ItemKind::Story,
            at: None,
            transition: Some(StatusTransition {
                from: StatusRef::Name("Doing".into()),
                to: StatusRef::Name("Ready".into()),
            }),
        }];
        assert_eq!(flowback(&events, &ordinals()).regressions, 1);
    }

    #[test]
    fn empty_input_is_zero() {
        let summary = flowback(&[], &ordinals());
        assert_eq!(summary.transitions, 0);
        assert!(summary.rate.abs() < f64::EPSILON);
        assert!(flowback_rate(0, 0).abs() < f64::EPSILON);
    }
}
