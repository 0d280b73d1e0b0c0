//! Normalized work item model
//!
//! Every optional backend field is an explicit `Option` here; downstream code
//! never performs defensive lookups on raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Display name used for items without an assignee
pub const UNASSIGNED: &str = "Unassigned";

/// Display value used for unknown status, priority or classification names
pub const NOT_AVAILABLE: &str = "N/A";

/// Backend identifier of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// User story
    Story,
    /// Task
    Task,
    /// Issue
    Issue,
}

impl ItemKind {
    /// All kinds in presentation order
    pub const ALL: [ItemKind; 3] = [ItemKind::Story, ItemKind::Task, ItemKind::Issue];

    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Story => "story",
            ItemKind::Task => "task",
            ItemKind::Issue => "issue",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "story" | "stories" | "userstory" | "userstories" | "us" => Ok(ItemKind::Story),
            "task" | "tasks" => Ok(ItemKind::Task),
            "issue" | "issues" => Ok(ItemKind::Issue),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// Variant-specific data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// User story
    Story,
    /// Task
    Task,
    /// Issue with its classification
    Issue {
        /// Issue type name (`N/A` if unresolved)
        issue_type: String,
        /// Severity name (`N/A` if unresolved)
        severity: String,
    },
}

impl Variant {
    /// Kind of this variant
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Variant::Story => ItemKind::Story,
            Variant::Task => ItemKind::Task,
            Variant::Issue { .. } => ItemKind::Issue,
        }
    }
}

/// A normalized work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Backend identifier
    pub id: ItemId,
    /// Human-visible sequence number
    pub reference: Option<i64>,
    /// Subject line
    pub subject: String,
    /// Kind plus variant-specific data
    #[serde(flatten)]
    pub variant: Variant,
    /// Status identifier
    pub status_id: Option<i64>,
    /// Status display name (`N/A` if unknown)
    pub status_name: String,
    /// Rank within the kind's status list; `None` when unresolved
    pub status_ordinal: Option<usize>,
    /// Assignee display name
    pub assignee: Option<String>,
    /// Priority name
    pub priority: Option<String>,
    /// Tag names
    pub tags: BTreeSet<String>,
    /// Milestone (sprint) identifier
    pub milestone_id: Option<i64>,
    /// Creation instant
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification instant
    pub modified_at: Option<DateTime<Utc>>,
    /// Completion instant; only present on closed items
    pub finished_at: Option<DateTime<Utc>>,
    /// Closed flag reported by the backend
    pub is_closed: bool,
    /// Blocked flag
    pub is_blocked: bool,
}

impl Item {
    /// Create a minimal open item
    #[must_use]
    pub fn new(id: i64, variant: Variant, subject: impl Into<String>) -> Self {
        Self {
            id: ItemId(id),
            reference: None,
            subject: subject.into(),
            variant,
            status_id: None,
            status_name: NOT_AVAILABLE.to_string(),
            status_ordinal: None,
            assignee: None,
            priority: None,
            tags: BTreeSet::new(),
            milestone_id: None,
            created_at: None,
            modified_at: None,
            finished_at: None,
            is_closed: false,
            is_blocked: false,
        }
    }

    /// Item kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.variant.kind()
    }

    /// Assignee name, or `Unassigned`
    #[inline]
    #[must_use]
    pub fn assignee_name(&self) -> &str {
        self.assignee.as_deref().unwrap_or(UNASSIGNED)
    }

    /// Priority name, or `N/A`
    #[inline]
    #[must_use]
    pub fn priority_name(&self) -> &str {
        self.priority.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Issue classification `(type, severity)` for issues
    #[inline]
    #[must_use]
    pub fn issue_classification(&self) -> Option<(&str, &str)> {
        match &self.variant {
            Variant::Issue {
                issue_type,
                severity,
            } => Some((issue_type, severity)),
            _ => None,
        }
    }

    /// With user-facing reference number
    #[must_use]
    pub fn with_reference(mut self, reference: i64) -> Self {
        self.reference = Some(reference);
        self
    }

    /// With status
    #[must_use]
    pub fn with_status(mut self, id: i64, name: impl Into<String>, ordinal: Option<usize>) -> Self {
        self.status_id = Some(id);
        self.status_name = name.into();
        self.status_ordinal = ordinal;
        self
    }

    /// With assignee
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// With creation and modification instants
    #[must_use]
    pub fn with_dates(mut self, created: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        self.created_at = Some(created);
        self.modified_at = Some(modified);
        self
    }

    /// Mark closed, finished at `finished`
    #[must_use]
    pub fn closed_at(mut self, finished: DateTime<Utc>) -> Self {
        self.is_closed = true;
        self.finished_at = Some(finished);
        self
    }
}

/// Sprint metadata passed through to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Backend identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Whether the sprint is closed
    #[serde(default)]
    pub closed: bool,
    /// Planned start date
    #[serde(default)]
    pub estimated_start: Option<chrono::NaiveDate>,
    /// Planned finish date
    #[serde(default)]
    pub estimated_finish: Option<chrono::NaiveDate>,
}

impl Milestone {
    /// Parse a milestone record
    ///
    /// # Errors
    /// - `ParseError::Shape` if the record lacks `id`/`name` or has bad dates
    pub fn from_value(value: &serde_json::Value) -> Result<Self, crate::ParseError> {
        Milestone::deserialize(value).map_err(|e| crate::ParseError::shape("milestone", e))
    }
}
