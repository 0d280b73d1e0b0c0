//! Error types for flow-core
//!
//! Parsing is the only fallible operation in this crate: metric functions
//! accept any item collection and never fail.

/// Errors raised while shaping backend payloads into the typed model
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Record is not a JSON object
    #[error("expected a JSON object for {context}, got {found}")]
    NotAnObject {
        /// What was being parsed
        context: &'static str,
        /// JSON type actually found
        found: &'static str,
    },

    /// Required field missing or of the wrong type
    #[error("missing or invalid field `{field}` in {context}")]
    MissingField {
        /// What was being parsed
        context: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Payload does not match the expected shape
    #[error("malformed {context}: {source}")]
    Shape {
        /// What was being parsed
        context: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

impl ParseError {
    /// Create shape error for context
    pub fn shape(context: &'static str, source: serde_json::Error) -> Self {
        Self::Shape { context, source }
    }
}

/// Name of the JSON type of `value`, for error messages
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField {
            context: "work item",
            field: "id",
        };
        assert_eq!(err.to_string(), "missing or invalid field `id` in work item");
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&serde_json::json!([])), "array");
        assert_eq!(json_type_name(&serde_json::json!(null)), "null");
        assert_eq!(json_type_name(&serde_json::json!({"a": 1})), "object");
    }
}
