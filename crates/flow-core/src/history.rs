//! Item history events
//!
//! Only status transitions matter for flowback; other history entries are
//! kept as events without a transition.

use crate::catalog::StatusRef;
use crate::item::{ItemId, ItemKind};
use crate::normalize::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A status change `from -> to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Previous status
    pub from: StatusRef,
    /// New status
    pub to: StatusRef,
}

/// One entry of an item's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Owning item
    pub item: ItemId,
    /// Kind of the owning item (selects the ordinal map)
    pub kind: ItemKind,
    /// When the change happened
    pub at: Option<DateTime<Utc>>,
    /// Status change, if this entry recorded one
    pub transition: Option<StatusTransition>,
}

impl HistoryEvent {
    /// Create event with a transition between two status ids
    #[must_use]
    pub fn status_change(item: ItemId, kind: ItemKind, from: i64, to: i64) -> Self {
        Self {
            item,
            kind,
            at: None,
            transition: Some(StatusTransition {
                from: StatusRef::Id(from),
                to: StatusRef::Id(to),
            }),
        }
    }
}

/// Parse the history array of one item
///
/// Entries that are not objects are ignored; `values_diff.status` must be a
/// two-element array of ids or names to count as a transition.
#[must_use]
pub fn parse_history(item: ItemId, kind: ItemKind, entries: &[Value]) -> Vec<HistoryEvent> {
    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| HistoryEvent {
            item,
            kind,
            at: entry
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            transition: entry
                .get("values_diff")
                .and_then(|diff| diff.get("status"))
                .and_then(status_pair),
        })
        .collect()
}

fn status_pair(value: &Value) -> Option<StatusTransition> {
    let [from, to] = value.as_array()?.as_slice() else {
        return None;
    };
    Some(StatusTransition {
        from: status_ref(from)?,
        to: status_ref(to)?,
    })
}

fn status_ref(value: &Value) -> Option<StatusRef> {
    match value {
        Value::Number(n) => n.as_i64().map(StatusRef::Id),
        Value::String(s) if !s.trim().is_empty() => Some(StatusRef::Name(s.trim().to_string())),
        _ => None,
    }
}
