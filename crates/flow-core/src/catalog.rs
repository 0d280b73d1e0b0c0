//! Project metadata and status ordinal maps
//!
//! The project payload carries one status-definition list per item kind. The
//! [`StatusOrdinalMap`] ranks each list by workflow position so that status
//! transitions can be compared; it is rebuilt for every fetch cycle.

use crate::error::{json_type_name, ParseError};
use crate::item::ItemKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entry of a project definition list (status, priority, severity, type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Backend identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Position within the list
    #[serde(default)]
    pub order: i64,
    /// Whether the status closes the item (status lists only)
    #[serde(default)]
    pub is_closed: bool,
}

/// Project payload, restricted to the fields the analytics core uses
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    /// Backend identifier
    pub id: i64,
    /// Project name
    #[serde(default)]
    pub name: Option<String>,
    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// User story statuses
    #[serde(default)]
    pub us_statuses: Vec<Definition>,
    /// Task statuses
    #[serde(default)]
    pub task_statuses: Vec<Definition>,
    /// Issue statuses
    #[serde(default)]
    pub issue_statuses: Vec<Definition>,
    /// Issue priorities
    #[serde(default)]
    pub priorities: Vec<Definition>,
    /// Issue severities
    #[serde(default)]
    pub severities: Vec<Definition>,
    /// Issue types
    #[serde(default)]
    pub issue_types: Vec<Definition>,
}

impl ProjectRecord {
    /// Parse the project payload
    ///
    /// # Errors
    /// - `ParseError::NotAnObject` if the payload is not an object
    /// - `ParseError::Shape` if a definition list is malformed or `id` is missing
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError::NotAnObject {
                context: "project",
                found: json_type_name(value),
            });
        }
        ProjectRecord::deserialize(value).map_err(|e| ParseError::shape("project", e))
    }

    /// Status definitions for `kind`
    #[inline]
    #[must_use]
    pub fn statuses(&self, kind: ItemKind) -> &[Definition] {
        match kind {
            ItemKind::Story => &self.us_statuses,
            ItemKind::Task => &self.task_statuses,
            ItemKind::Issue => &self.issue_statuses,
        }
    }

    /// Summary passed to the presentation layer
    #[must_use]
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone().unwrap_or_else(|| "Unnamed project".to_string()),
            slug: self.slug.clone(),
            description: self.description.clone().unwrap_or_default(),
        }
    }
}

/// Project identity shown alongside the metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Backend identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL slug
    pub slug: Option<String>,
    /// Description (empty if absent)
    pub description: String,
}

/// Reference to a status as reported by history events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusRef {
    /// Status identifier
    Id(i64),
    /// Status display name
    Name(String),
}

/// Ranked statuses of a single item kind
#[derive(Debug, Clone, Default)]
struct KindOrdinals {
    by_id: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

/// Per-kind mapping from status to workflow rank
///
/// Ranks are dense (`0..n`), assigned by sorting each definition list on
/// `(order, id)`.
#[derive(Debug, Clone, Default)]
pub struct StatusOrdinalMap {
    kinds: HashMap<ItemKind, KindOrdinals>,
}

impl StatusOrdinalMap {
    /// Create empty map (every lookup unresolved)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the project's status lists
    #[must_use]
    pub fn from_project(project: &ProjectRecord) -> Self {
        let mut map = Self::new();
        for kind in ItemKind::ALL {
            map.set_statuses(kind, project.statuses(kind));
        }
        map
    }

    /// Replace the ranking for `kind`
    pub fn set_statuses(&mut self, kind: ItemKind, statuses: &[Definition]) {
        let mut ranked: Vec<&Definition> = statuses.iter().collect();
        ranked.sort_by_key(|d| (d.order, d.id));

        let mut ordinals = KindOrdinals::default();
        for (rank, def) in ranked.into_iter().enumerate() {
            ordinals.by_id.insert(def.id, rank);
            ordinals.by_name.entry(def.name.to_lowercase()).or_insert(rank);
        }
        self.kinds.insert(kind, ordinals);
    }

    /// Rank of status `id` for `kind`
    #[inline]
    #[must_use]
    pub fn ordinal(&self, kind: ItemKind, id: i64) -> Option<usize> {
        self.kinds.get(&kind)?.by_id.get(&id).copied()
    }

    /// Rank of status `name` for `kind` (case-insensitive)
    #[inline]
    #[must_use]
    pub fn ordinal_by_name(&self, kind: ItemKind, name: &str) -> Option<usize> {
        self.kinds.get(&kind)?.by_name.get(&name.to_lowercase()).copied()
    }

    /// Rank of a history status reference
    #[must_use]
    pub fn resolve(&self, kind: ItemKind, status: &StatusRef) -> Option<usize> {
        match status {
            StatusRef::Id(id) => self.ordinal(kind, *id),
            StatusRef::Name(name) => self.ordinal_by_name(kind, name),
        }
    }

    /// Number of ranked statuses for `kind`
    #[inline]
    #[must_use]
    pub fn len(&self, kind: ItemKind) -> usize {
        self.kinds.get(&kind).map_or(0, |k| k.by_id.len())
    }
}

/// Lookups the normalizer needs to turn backend ids into names and ranks
#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog {
    /// Status ranks per kind
    pub ordinals: StatusOrdinalMap,
    statuses: HashMap<(ItemKind, i64), Definition>,
    priorities: HashMap<i64, String>,
    severities: HashMap<i64, String>,
    issue_types: HashMap<i64, String>,
}

impl ProjectCatalog {
    /// Build catalog from the project payload
    #[must_use]
    pub fn from_project(project: &ProjectRecord) -> Self {
        let names = |defs: &[Definition]| -> HashMap<i64, String> {
            defs.iter().map(|d| (d.id, d.name.clone())).collect()
        };

        let mut statuses = HashMap::new();
        for kind in ItemKind::ALL {
            for def in project.statuses(kind) {
                statuses.insert((kind, def.id), def.clone());
            }
        }

        Self {
            ordinals: StatusOrdinalMap::from_project(project),
            statuses,
            priorities: names(&project.priorities),
            severities: names(&project.severities),
            issue_types: names(&project.issue_types),
        }
    }

    /// Status definition for `kind`/`id`
    #[inline]
    #[must_use]
    pub fn status(&self, kind: ItemKind, id: i64) -> Option<&Definition> {
        self.statuses.get(&(kind, id))
    }

    /// Priority name for `id`
    #[inline]
    #[must_use]
    pub fn priority(&self, id: i64) -> Option<&str> {
        self.priorities.get(&id).map(String::as_str)
    }

    /// Severity name for `id`
    #[inline]
    #[must_use]
    pub fn severity(&self, id: i64) -> Option<&str> {
        self.severities.get(&id).map(String::as_str)
    }

    /// Issue type name for `id`
    #[inline]
    #[must_use]
    pub fn issue_type(&self, id: i64) -> Option<&str> {
        self.issue_types.get(&id).map(String::as_str)
    }
}
