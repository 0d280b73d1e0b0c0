//! Aging of open work

use crate::item::{Item, ItemKind};
use crate::vocabulary::WorkflowVocabulary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One open item and the whole days since its last modification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingEntry {
    /// Human-visible reference number
    pub reference: Option<i64>,
    /// Subject line
    pub subject: String,
    /// Status name
    pub status: String,
    /// Whole days since last modification
    pub age_days: i64,
    /// Assignee display name
    pub assignee: String,
    /// Item kind
    pub kind: ItemKind,
}

/// Whether `item` is still open
///
/// The closed flag and the closed-status vocabulary are checked
/// independently; either one closes the item.
#[inline]
#[must_use]
pub fn is_open(item: &Item, vocabulary: &WorkflowVocabulary) -> bool {
    !item.is_closed && !vocabulary.is_closed(&item.status_name)
}

/// Age every open item relative to `now`, oldest first
///
/// Items without a modification time are skipped. Modification times in the
/// future age as zero days. Equal ages keep input order.
#[must_use]
pub fn aging(items: &[Item], vocabulary: &WorkflowVocabulary, now: DateTime<Utc>) -> Vec<AgingEntry> {
    let mut entries: Vec<AgingEntry> = items
        .iter()
        .filter(|item| is_open(item, vocabulary))
        .filter_map(|item| {
            let modified = item.modified_at?;
            Some(AgingEntry {
                reference: item.reference,
                subject: item.subject.clone(),
                status: item.status_name.clone(),
                age_days: (now - modified).num_days().max(0),
                assignee: item.assignee_name().to_string(),
                kind: item.kind(),
            })
        })
        .collect();
    // stable sort keeps input order among equal ages
    entries.sort_by(|a, b| b.age_days.cmp(&a.age_days));
    entries
}
