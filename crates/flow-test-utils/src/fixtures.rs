//! JSON fixture builders shaped like Taiga API payloads

use serde_json::{json, Map, Value};

/// Project with ranked statuses for every kind plus issue classifications
///
/// Story statuses: New(1) → In progress(2) → Ready for test(3) → Done(4).
/// Task statuses: New(11) → In progress(12) → Closed(13).
/// Issue statuses: New(21) → In progress(22) → Closed(23).
pub fn project(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Project {slug}"),
        "slug": slug,
        "description": "Synthetic project",
        "us_statuses": [
            {"id": 1, "name": "New", "order": 1, "is_closed": false},
            {"id": 2, "name": "In progress", "order": 2, "is_closed": false},
            {"id": 3, "name": "Ready for test", "order": 3, "is_closed": false},
            {"id": 4, "name": "Done", "order": 4, "is_closed": true}
        ],
        "task_statuses": [
            {"id": 11, "name": "New", "order": 1, "is_closed": false},
            {"id": 12, "name": "In progress", "order": 2, "is_closed": false},
            {"id": 13, "name": "Closed", "order": 3, "is_closed": true}
        ],
        "issue_statuses": [
            {"id": 21, "name": "New", "order": 1, "is_closed": false},
            {"id": 22, "name": "In progress", "order": 2, "is_closed": false},
            {"id": 23, "name": "Closed", "order": 3, "is_closed": true}
        ],
        "priorities": [
            {"id": 31, "name": "Low", "order": 1},
            {"id": 32, "name": "Normal", "order": 2},
            {"id": 33, "name": "High", "order": 3}
        ],
        "severities": [
            {"id": 41, "name": "Minor", "order": 1},
            {"id": 42, "name": "Critical", "order": 2}
        ],
        "issue_types": [
            {"id": 51, "name": "Bug", "order": 1},
            {"id": 52, "name": "Enhancement", "order": 2}
        ]
    })
}

/// Builder for story, task and issue records
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Record with `id`, `ref` equal to the id and a generated subject
    pub fn new(id: i64) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), json!(id));
        fields.insert("ref".into(), json!(id));
        fields.insert("subject".into(), json!(format!("Item {id}")));
        Self { fields }
    }

    /// Status id and its display name
    pub fn status(mut self, id: i64, name: &str) -> Self {
        self.fields.insert("status".into(), json!(id));
        self.fields
            .insert("status_extra_info".into(), json!({"name": name}));
        self
    }

    /// Assignee display name
    pub fn assigned(mut self, name: &str) -> Self {
        self.fields.insert(
            "assigned_to_extra_info".into(),
            json!({"full_name_display": name, "username": name.to_lowercase()}),
        );
        self
    }

    /// Creation and modification timestamps
    pub fn dates(mut self, created: &str, modified: &str) -> Self {
        self.fields.insert("created_date".into(), json!(created));
        self.fields.insert("modified_date".into(), json!(modified));
        self
    }

    /// Mark closed with a completion timestamp under `finished_date`
    pub fn finished(mut self, finished: &str) -> Self {
        self.fields.insert("finished_date".into(), json!(finished));
        self.fields.insert("is_closed".into(), json!(true));
        self
    }

    /// Tags in Taiga's `[name, color]` form
    pub fn tags(mut self, tags: &[&str]) -> Self {
        let tags: Vec<Value> = tags.iter().map(|t| json!([t, null])).collect();
        self.fields.insert("tags".into(), Value::Array(tags));
        self
    }

    /// Blocked flag
    pub fn blocked(mut self) -> Self {
        self.fields.insert("is_blocked".into(), json!(true));
        self
    }

    /// Issue priority, severity and type ids
    pub fn classified(mut self, priority: i64, severity: i64, issue_type: i64) -> Self {
        self.fields.insert("priority".into(), json!(priority));
        self.fields.insert("severity".into(), json!(severity));
        self.fields.insert("type".into(), json!(issue_type));
        self
    }

    /// Arbitrary extra field
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Finish the record
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Shorthand for [`RecordBuilder::new`]
pub fn record(id: i64) -> RecordBuilder {
    RecordBuilder::new(id)
}

/// Milestone payload
pub fn milestone(id: i64, name: &str, closed: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "closed": closed,
        "estimated_start": "2024-06-01",
        "estimated_finish": "2024-06-14"
    })
}

/// History entry recording a status change
pub fn status_change(at: &str, from: i64, to: i64) -> Value {
    json!({
        "created_at": at,
        "values_diff": {"status": [from, to]}
    })
}

/// `count` plain records starting at `first_id`
pub fn records(first_id: i64, count: usize) -> Vec<Value> {
    (first_id..).take(count).map(|id| record(id).build()).collect()
}
