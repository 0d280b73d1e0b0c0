//! Filter pipeline
//!
//! A [`PredicateSet`] holds one optional selection per dimension. Unset
//! dimensions match everything and the active ones combine with AND, so the
//! order in which predicates are applied never changes the result.
//!
//! Status, assignee and priority names match ignoring ASCII case, the same
//! rule [`WorkflowVocabulary`](crate::WorkflowVocabulary) uses. Tags match
//! exactly.

use crate::item::{Item, ItemKind};
use crate::vocabulary::contains_ignore_case;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-selected filter dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateSet {
    /// Item kinds to keep
    pub kinds: BTreeSet<ItemKind>,
    /// Assignee display names (`Unassigned` selects unassigned items), any case
    pub assignees: BTreeSet<String>,
    /// Status names, any case
    pub statuses: BTreeSet<String>,
    /// Priority names (`N/A` selects items without priority)
    pub priorities: BTreeSet<String>,
    /// Keep items carrying at least one of these tags
    pub tags: BTreeSet<String>,
    /// Keep only blocked items
    pub blocked_only: bool,
    /// Keep only unassigned items
    pub unassigned_only: bool,
    /// Earliest creation date (inclusive)
    pub created_from: Option<NaiveDate>,
    /// Latest creation date (inclusive)
    pub created_to: Option<NaiveDate>,
}

/// A single active filter dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Kind in set
    Kind(BTreeSet<ItemKind>),
    /// Assignee display name in set
    Assignee(BTreeSet<String>),
    /// Status name in set
    Status(BTreeSet<String>),
    /// Priority name in set
    Priority(BTreeSet<String>),
    /// Tags intersect set
    Tags(BTreeSet<String>),
    /// Item is blocked
    Blocked,
    /// Item has no assignee
    Unassigned,
    /// Creation date within inclusive bounds
    CreatedBetween(Option<NaiveDate>, Option<NaiveDate>),
}

impl Predicate {
    /// Whether `item` passes this predicate
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Predicate::Kind(kinds) => kinds.contains(&item.kind()),
            Predicate::Assignee(names) => contains_ignore_case(names, item.assignee_name()),
            Predicate::Status(names) => contains_ignore_case(names, &item.status_name),
            Predicate::Priority(names) => contains_ignore_case(names, item.priority_name()),
            Predicate::Tags(tags) => !item.tags.is_disjoint(tags),
            Predicate::Blocked => item.is_blocked,
            Predicate::Unassigned => item.assignee.is_none(),
            Predicate::CreatedBetween(from, to) => {
                let Some(created) = item.created_at.map(|c| c.date_naive()) else {
                    return false;
                };
                from.map_or(true, |f| created >= f) && to.map_or(true, |t| created <= t)
            }
        }
    }
}

impl PredicateSet {
    /// Create empty set (matches everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no dimension is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// Active predicates, one per selected dimension
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if !self.kinds.is_empty() {
            out.push(Predicate::Kind(self.kinds.clone()));
        }
        if !self.assignees.is_empty() {
            out.push(Predicate::Assignee(self.assignees.clone()));
        }
        if !self.statuses.is_empty() {
            out.push(Predicate::Status(self.statuses.clone()));
        }
        if !self.priorities.is_empty() {
            out.push(Predicate::Priority(self.priorities.clone()));
        }
        if !self.tags.is_empty() {
            out.push(Predicate::Tags(self.tags.clone()));
        }
        if self.blocked_only {
            out.push(Predicate::Blocked);
        }
        if self.unassigned_only {
            out.push(Predicate::Unassigned);
        }
        if self.created_from.is_some() || self.created_to.is_some() {
            out.push(Predicate::CreatedBetween(self.created_from, self.created_to));
        }
        out
    }

    /// Whether `item` passes every active predicate
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        self.predicates().iter().all(|p| p.matches(item))
    }

    /// With kinds
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ItemKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// With statuses
    #[must_use]
    pub fn with_statuses<S: Into<String>>(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.statuses.extend(statuses.into_iter().map(Into::into));
        self
    }

    /// With assignees
    #[must_use]
    pub fn with_assignees<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.assignees.extend(names.into_iter().map(Into::into));
        self
    }

    /// With tags
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Keep the items matching every predicate of `set`, preserving order
#[must_use]
pub fn apply(items: &[Item], set: &PredicateSet) -> Vec<Item> {
    apply_in_order(items, &set.predicates())
}

/// Apply `predicates` one after another, preserving item order
#[must_use]
pub fn apply_in_order(items: &[Item], predicates: &[Predicate]) -> Vec<Item> {
    let mut current: Vec<Item> = items.to_vec();
    for predicate in predicates {
        current.retain(|item| predicate.matches(item));
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Variant, NOT_AVAILABLE, UNASSIGNED};
    use chrono::{TimeZone, Utc};

    fn items() -> Vec<Item> {
        let day = |d| Utc.with_ymd_and_hms(2024, 4, d, 12, 0, 0).unwrap();
        let mut blocked = Item::new(1, Variant::Story, "a")
            .with_status(1, "Doing", Some(1))
            .with_assignee("Ana")
            .with_dates(day(1), day(2));
        blocked.is_blocked = true;
        blocked.tags.insert("backend".into());

        let mut bug = Item::new(
            2,
            Variant::Issue {
                issue_type: "Bug".into(),
                severity: "Minor".into(),
            },
            "b",
        )
        .with_status(5, "Open", Some(0))
        .with_dates(day(10), day(11));
        bug.priority = Some("High".into());
        bug.tags.insert("frontend".into());

        let task = Item::new(3, Variant::Task, "c")
            .with_status(2, "Done", Some(2))
            .with_assignee("Rui");

        vec![blocked, bug, task]
    }

    fn ids(items: &[Item]) -> Vec<i64> {
        items.iter().map(|i| i.id.0).collect()
    }

    #[test]
    fn empty_set_matches_everything() {
        let set = PredicateSet::new();
        assert!(set.is_empty());
        assert_eq!(ids(&apply(&items(), &set)), vec![1, 2, 3]);
    }

    #[test]
    fn dimensions_combine_with_and() {
        let set = PredicateSet::new()
            .with_kinds([ItemKind::Story, ItemKind::Task])
            .with_statuses(["Doing", "Done"])
            .with_assignees(["Ana"]);
        assert_eq!(ids(&apply(&items(), &set)), vec![1]);
    }

    #[test]
    fn unassigned_sentinel_and_flag() {
        let by_name = PredicateSet::new().with_assignees([UNASSIGNED]);
        assert_eq!(ids(&apply(&items(), &by_name)), vec![2]);

        let by_flag = PredicateSet {
            unassigned_only: true,
            ..PredicateSet::default()
        };
        assert_eq!(ids(&apply(&items(), &by_flag)), vec![2]);
    }

    #[test]
    fn priority_sentinel_selects_missing_priority() {
        let mut set = PredicateSet::new();
        set.priorities.insert(NOT_AVAILABLE.to_string());
        assert_eq!(ids(&apply(&items(), &set)), vec![1, 3]);
    }

    #[test]
    fn names_match_ignoring_case() {
        let set = PredicateSet::new().with_statuses(["done", "OPEN"]);
        assert_eq!(ids(&apply(&items(), &set)), vec![2, 3]);

        let set = PredicateSet::new().with_assignees(["ana", "unassigned"]);
        assert_eq!(ids(&apply(&items(), &set)), vec![1, 2]);

        let mut set = PredicateSet::new();
        set.priorities.insert("high".into());
        assert_eq!(ids(&apply(&items(), &set)), vec![2]);

        let exact_tags = PredicateSet::new().with_tags(["Backend"]);
        assert!(apply(&items(), &exact_tags).is_empty());
    }

    #[test]
    fn tags_intersect() {
        let set = PredicateSet::new().with_tags(["frontend", "mobile"]);
        assert_eq!(ids(&apply(&items(), &set)), vec![2]);
    }

    #[test]
    fn blocked_only() {
        let set = PredicateSet {
            blocked_only: true,
            ..PredicateSet::default()
        };
        assert_eq!(ids(&apply(&items(), &set)), vec![1]);
    }

    #[test]
    fn created_range_is_inclusive_and_drops_undated() {
        let set = PredicateSet {
            created_from: NaiveDate::from_ymd_opt(2024, 4, 1),
            created_to: NaiveDate::from_ymd_opt(2024, 4, 10),
            ..PredicateSet::default()
        };
        assert_eq!(ids(&apply(&items(), &set)), vec![1, 2]);

        let open_start = PredicateSet {
            created_to: NaiveDate::from_ymd_opt(2024, 4, 5),
            ..PredicateSet::default()
        };
        assert_eq!(ids(&apply(&items(), &open_start)), vec![1]);
    }
}
