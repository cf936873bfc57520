//! Error types for the drag-and-drop core.
//!
//! Most operations in this crate are total: merging containers, replaying
//! listeners and reconciling a drop never fail. Errors exist only at the
//! edges, where external data enters the system or where a caller drives a
//! gesture against an engine that can no longer service it.

use thiserror::Error;

use crate::dom::ContainerId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DndError>;

/// Errors surfaced by the drag-and-drop core.
#[derive(Debug, Error)]
pub enum DndError {
    /// A record supplied at the ingestion boundary was not a JSON object.
    #[error("expected an object-shaped record, found {found}")]
    NotAnObject {
        /// JSON type name of the offending value.
        found: &'static str,
    },

    /// An items collection was not an array of objects.
    #[error("expected an array of object records, found {found}")]
    NotAnArrayOfObjects {
        /// JSON type name of the offending value (or element).
        found: &'static str,
    },

    /// A serialized payload could not be parsed or converted.
    #[error("invalid item payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A container id was referenced that is not registered.
    #[error("container `{0}` is not registered")]
    UnknownContainer(ContainerId),

    /// A gesture was attempted on an engine instance that has been destroyed.
    #[error("drag engine instance has been destroyed")]
    EngineDestroyed,

    /// A gesture step required an active drag but none was in progress.
    #[error("no drag is in progress")]
    NoActiveDrag,

    /// A predicate refused the requested gesture.
    #[error("gesture rejected by the `{0}` predicate")]
    Rejected(&'static str),
}

/// Name the JSON type of a value for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
        assert_eq!(json_type_name(&json!("s")), "string");
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = DndError::UnknownContainer(ContainerId::from("left"));
        assert_eq!(err.to_string(), "container `left` is not registered");

        let err = DndError::NotAnObject { found: "number" };
        assert!(err.to_string().contains("number"));
    }
}
