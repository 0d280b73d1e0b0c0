//! Raw record normalization
//!
//! Converts backend JSON into [`Item`]s. Absent sub-objects become `None` or
//! a sentinel; malformed dates are reported as [`DataQualityIssue`]s and
//! treated as absent. Only records without a usable `id` are rejected.

use crate::catalog::ProjectCatalog;
use crate::error::{json_type_name, ParseError};
use crate::item::{Item, ItemId, ItemKind, Variant, NOT_AVAILABLE};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Wire shape of a story, task or issue; every field optional except `id`
#[derive(Debug, Deserialize)]
struct RawItem {
    id: i64,
    #[serde(rename = "ref", default)]
    reference: Option<i64>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    status_extra_info: Option<RawStatusInfo>,
    #[serde(default)]
    assigned_to_extra_info: Option<RawUserInfo>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(rename = "type", default)]
    issue_type: Option<Value>,
    #[serde(default)]
    tags: Option<Vec<Value>>,
    #[serde(default)]
    milestone: Option<i64>,
    #[serde(default)]
    created_date: Option<String>,
    #[serde(default)]
    modified_date: Option<String>,
    // user stories report `finish_date`, tasks and issues `finished_date`
    #[serde(default)]
    finish_date: Option<String>,
    #[serde(default)]
    finished_date: Option<String>,
    #[serde(default)]
    is_closed: Option<bool>,
    #[serde(default)]
    is_blocked: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawStatusInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_closed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawUserInfo {
    #[serde(default)]
    full_name_display: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// A per-item data problem that did not prevent normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    /// Affected item, if its id was readable
    pub item: Option<ItemId>,
    /// Kind of the affected record
    pub kind: ItemKind,
    /// Field concerned
    pub field: String,
    /// Human-readable description
    pub detail: String,
}

impl DataQualityIssue {
    fn new(item: Option<ItemId>, kind: ItemKind, field: &str, detail: impl Into<String>) -> Self {
        Self {
            item,
            kind,
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

/// Normalization result for a single record
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The typed item
    pub item: Item,
    /// Problems found while normalizing
    pub issues: Vec<DataQualityIssue>,
}

/// Normalization result for a whole collection
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Items in input order
    pub items: Vec<Item>,
    /// Problems found, including rejected records
    pub issues: Vec<DataQualityIssue>,
    /// Number of records that could not be normalized at all
    pub rejected: usize,
}

/// Normalize one raw record of `kind`
///
/// # Errors
/// - `ParseError::NotAnObject` if the record is not a JSON object
/// - `ParseError::MissingField` if `id` is absent or not an integer
/// - `ParseError::Shape` if a present field has an unexpected JSON type
pub fn normalize(
    raw: &Value,
    kind: ItemKind,
    catalog: &ProjectCatalog,
) -> Result<Normalized, ParseError> {
    let Some(object) = raw.as_object() else {
        return Err(ParseError::NotAnObject {
            context: "work item",
            found: json_type_name(raw),
        });
    };
    if object.get("id").and_then(Value::as_i64).is_none() {
        return Err(ParseError::MissingField {
            context: "work item",
            field: "id",
        });
    }
    let raw = RawItem::deserialize(raw).map_err(|e| ParseError::shape("work item", e))?;

    let id = ItemId(raw.id);
    let mut issues = Vec::new();
    let mut date = |field: &str, value: Option<&str>| -> Option<DateTime<Utc>> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            issues.push(DataQualityIssue::new(
                Some(id),
                kind,
                field,
                format!("unparseable timestamp {value:?}"),
            ));
        }
        parsed
    };

    let created_at = date("created_date", raw.created_date.as_deref());
    let modified_at = date("modified_date", raw.modified_date.as_deref());
    let finished_raw = raw.finished_date.as_deref().or(raw.finish_date.as_deref());
    let mut finished_at = date("finished_date", finished_raw);

    let status_info = raw.status_extra_info.as_ref();
    let status_def = raw.status.and_then(|s| catalog.status(kind, s));
    let status_name = status_info
        .and_then(|s| non_empty(s.name.as_deref()))
        .or_else(|| status_def.map(|d| d.name.as_str()))
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    let status_ordinal = raw.status.and_then(|s| catalog.ordinals.ordinal(kind, s));

    let is_closed = raw
        .is_closed
        .or_else(|| status_info.and_then(|s| s.is_closed))
        .or_else(|| status_def.map(|d| d.is_closed))
        .unwrap_or(false);

    if !is_closed && finished_at.is_some() {
        issues.push(DataQualityIssue::new(
            Some(id),
            kind,
            "finished_date",
            "completion date on an open item ignored",
        ));
        finished_at = None;
    }

    let assignee = raw.assigned_to_extra_info.as_ref().and_then(|user| {
        non_empty(user.full_name_display.as_deref())
            .or_else(|| non_empty(user.username.as_deref()))
            .map(str::to_string)
    });

    let priority = lookup_name(raw.priority.as_ref(), |id| catalog.priority(id));

    let variant = match kind {
        ItemKind::Story => Variant::Story,
        ItemKind::Task => Variant::Task,
        ItemKind::Issue => Variant::Issue {
            issue_type: lookup_name(raw.issue_type.as_ref(), |id| catalog.issue_type(id))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            severity: lookup_name(raw.severity.as_ref(), |id| catalog.severity(id))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        },
    };

    let item = Item {
        id,
        reference: raw.reference,
        subject: raw.subject.unwrap_or_default(),
        variant,
        status_id: raw.status,
        status_name,
        status_ordinal,
        assignee,
        priority,
        tags: raw.tags.as_deref().map(tag_names).unwrap_or_default(),
        milestone_id: raw.milestone,
        created_at,
        modified_at,
        finished_at,
        is_closed,
        is_blocked: raw.is_blocked.unwrap_or(false),
    };

    Ok(Normalized { item, issues })
}

/// Normalize a collection, skipping records that cannot be parsed
#[must_use]
pub fn normalize_all(records: &[Value], kind: ItemKind, catalog: &ProjectCatalog) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for record in records {
        match normalize(record, kind, catalog) {
            Ok(normalized) => {
                for issue in &normalized.issues {
                    tracing::warn!(
                        item = ?issue.item,
                        kind = %kind,
                        field = %issue.field,
                        "data quality: {}",
                        issue.detail
                    );
                }
                batch.issues.extend(normalized.issues);
                batch.items.push(normalized.item);
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "skipping malformed record");
                let item = record.get("id").and_then(Value::as_i64).map(ItemId);
                batch.rejected += 1;
                batch
                    .issues
                    .push(DataQualityIssue::new(item, kind, "record", e.to_string()));
            }
        }
    }
    batch
}

/// Parse a backend timestamp into UTC
///
/// Accepts RFC 3339 with an offset, naive date-times (assumed UTC) and bare
/// dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve an id-or-name field through `by_id`
fn lookup_name<'a>(value: Option<&Value>, by_id: impl Fn(i64) -> Option<&'a str>) -> Option<String> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(by_id).map(str::to_string),
        Value::String(s) => non_empty(Some(s.as_str())).map(str::to_string),
        Value::Object(o) => non_empty(o.get("name").and_then(Value::as_str)).map(str::to_string),
        _ => None,
    }
}

/// Tag names from either `["a", "b"]` or `[["a", "#color"], ...]`
fn tag_names(tags: &[Value]) -> BTreeSet<String> {
    tags.iter()
        .filter_map(|tag| match tag {
            Value::String(s) => Some(s.as_str()),
            Value::Array(pair) => pair.first().and_then(Value::as_str),
            _ => None,
        })
        .filter_map(|name| non_empty(Some(name)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProjectRecord;
    use crate::item::UNASSIGNED;
    use chrono::TimeZone;
    use serde_json::json;

    fn catalog() -> ProjectCatalog {
        ProjectCatalog::from_project(
            &ProjectRecord::from_value(&json!({
                "id": 1,
                "us_statuses": [
                    {"id": 1, "name": "New", "order": 1},
                    {"id": 2, "name": "Done", "order": 2, "is_closed": true}
                ],
                "issue_statuses": [{"id": 5, "name": "Open", "order": 1}],
                "priorities": [{"id": 3, "name": "High"}],
                "severities": [{"id": 4, "name": "Blocker"}],
                "issue_types": [{"id": 6, "name": "Bug"}]
            }))
            .unwrap(),
        )
    }

    #[test]
    fn normalizes_full_story() {
        let raw = json!({
            "id": 10,
            "ref": 42,
            "subject": "Login page",
            "status": 2,
            "status_extra_info": {"name": "Done", "is_closed": true},
            "assigned_to_extra_info": {"full_name_display": "Ana Lima", "username": "ana"},
            "tags": [["ux", "#f00"], ["web", null]],
            "milestone": 3,
            "created_date": "2024-01-01T10:00:00Z",
            "modified_date": "2024-01-05T10:00:00+02:00",
            "finish_date": "2024-01-04T10:00:00Z",
            "is_closed": true,
            "is_blocked": false
        });
        let Normalized { item, issues } = normalize(&raw, ItemKind::Story, &catalog()).unwrap();
        assert!(issues.is_empty());
        assert_eq!(item.reference, Some(42));
        assert_eq!(item.status_name, "Done");
        assert_eq!(item.status_ordinal, Some(1));
        assert_eq!(item.assignee.as_deref(), Some("Ana Lima"));
        assert_eq!(item.tags.len(), 2);
        assert!(item.tags.contains("ux"));
        assert_eq!(item.milestone_id, Some(3));
        assert_eq!(
            item.modified_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap())
        );
        assert!(item.finished_at.is_some());
    }

    #[test]
    fn missing_sub_objects_use_sentinels() {
        let raw = json!({"id": 11, "subject": "bare", "assigned_to_extra_info": null});
        let item = normalize(&raw, ItemKind::Task, &catalog()).unwrap().item;
        assert_eq!(item.assignee_name(), UNASSIGNED);
        assert_eq!(item.status_name, NOT_AVAILABLE);
        assert_eq!(item.status_ordinal, None);
        assert_eq!(item.priority, None);
        assert!(!item.is_closed);
    }

    #[test]
    fn unknown_status_id_is_unresolved_but_named() {
        let raw = json!({
            "id": 12,
            "status": 99,
            "status_extra_info": {"name": "Custom"}
        });
        let item = normalize(&raw, ItemKind::Story, &catalog()).unwrap().item;
        assert_eq!(item.status_name, "Custom");
        assert_eq!(item.status_ordinal, None);
    }

    #[test]
    fn status_name_falls_back_to_catalog() {
        let raw = json!({"id": 13, "status": 2});
        let item = normalize(&raw, ItemKind::Story, &catalog()).unwrap().item;
        assert_eq!(item.status_name, "Done");
        assert!(item.is_closed);
    }

    #[test]
    fn issue_classification_resolves_ids() {
        let raw = json!({"id": 14, "status": 5, "priority": 3, "severity": 4, "type": 6});
        let item = normalize(&raw, ItemKind::Issue, &catalog()).unwrap().item;
        assert_eq!(item.issue_classification(), Some(("Bug", "Blocker")));
        assert_eq!(item.priority.as_deref(), Some("High"));
        assert_eq!(item.status_ordinal, Some(0));
    }

    #[test]
    fn unresolved_issue_classification_is_not_available() {
        let raw = json!({"id": 15, "severity": 404});
        let item = normalize(&raw, ItemKind::Issue, &catalog()).unwrap().item;
        assert_eq!(item.issue_classification(), Some((NOT_AVAILABLE, NOT_AVAILABLE)));
    }

    #[test]
    fn malformed_date_is_reported_not_fatal() {
        let raw = json!({"id": 16, "created_date": "yesterday", "modified_date": "2024-02-01"});
        let out = normalize(&raw, ItemKind::Task, &catalog()).unwrap();
        assert_eq!(out.item.created_at, None);
        assert_eq!(
            out.item.modified_at,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].field, "created_date");
    }

    #[test]
    fn finished_date_on_open_item_is_dropped() {
        let raw = json!({"id": 17, "is_closed": false, "finished_date": "2024-02-01T00:00:00Z"});
        let out = normalize(&raw, ItemKind::Task, &catalog()).unwrap();
        assert_eq!(out.item.finished_at, None);
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn record_without_id_is_rejected() {
        let err = normalize(&json!({"subject": "x"}), ItemKind::Task, &catalog()).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field: "id", .. }));

        let err = normalize(&json!("x"), ItemKind::Task, &catalog()).unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { .. }));
    }

    #[test]
    fn normalize_all_skips_bad_records() {
        let records = vec![json!({"id": 1}), json!({"id": "one"}), json!({"id": 3, "milestone": "x"})];
        let batch = normalize_all(&records, ItemKind::Task, &catalog());
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.rejected, 2);
        assert_eq!(batch.issues.len(), 2);
        assert_eq!(batch.issues[1].item, Some(ItemId(3)));
    }

    #[test]
    fn timestamps_in_several_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00-03:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert!(parse_timestamp("03/01/2024").is_none());
    }
}
