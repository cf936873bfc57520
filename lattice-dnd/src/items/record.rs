//! Application records and the ingestion guard.
//!
//! Inside the core every record is a JSON object ([`Record`]). The shape is
//! enforced by the type system everywhere except at the points where
//! untyped data enters: a JSON items collection handed over by the host, or
//! a serialized payload carried on a node. Those points go through the
//! functions in this module and fail fast on anything that is not an object.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{json_type_name, DndError, Result};

/// An object-shaped application record.
pub type Record = serde_json::Map<String, Value>;

/// Accept a single JSON value as a record.
pub fn record_from_value(value: Value) -> Result<Record> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(DndError::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

/// Accept a JSON value as an items collection.
///
/// The value must be an array whose every element is an object.
pub fn records_from_value(value: Value) -> Result<Vec<Record>> {
    let Value::Array(elements) = value else {
        return Err(DndError::NotAnArrayOfObjects {
            found: json_type_name(&value),
        });
    };

    elements
        .into_iter()
        .map(|element| match element {
            Value::Object(record) => Ok(record),
            other => Err(DndError::NotAnArrayOfObjects {
                found: json_type_name(&other),
            }),
        })
        .collect()
}

/// Convert typed application items into records.
pub fn records_from_serializable<T: Serialize>(items: &[T]) -> Result<Vec<Record>> {
    items
        .iter()
        .map(|item| record_from_value(serde_json::to_value(item)?))
        .collect()
}

/// Parse a serialized payload attribute into a record.
pub fn parse_record(json: &str) -> Result<Record> {
    record_from_value(serde_json::from_str(json)?)
}

/// Serialize a record into payload attribute form.
pub fn serialize_record(record: &Record) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Convert a record back into a typed application item.
pub fn record_into<T: DeserializeOwned>(record: &Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record.clone()))?)
}
