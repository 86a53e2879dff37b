//! Stable object keys: `namespace/name`, or `name` for cluster-scoped objects.

use serde::Serialize;
use serde_json::Value;

use super::DeletedObject;
use crate::FilterError;
use crate::Result;

pub fn meta_namespace_key<T: Serialize>(obj: &T) -> Result<String> {
    let value = serde_json::to_value(obj).map_err(FilterError::from)?;
    key_from_value(&value)
}

/// Like [`meta_namespace_key`], but a tombstone yields the key it carries.
pub fn deletion_handling_key<T: Serialize>(deleted: &DeletedObject<T>) -> Result<String> {
    match deleted {
        DeletedObject::Object(obj) => meta_namespace_key(obj),
        DeletedObject::Tombstone { key, .. } => Ok(key.clone()),
    }
}

pub(crate) fn key_from_value(value: &Value) -> Result<String> {
    let metadata = value
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| FilterError::KeyDerivation("object has no metadata".into()))?;

    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FilterError::KeyDerivation("metadata.name is missing".into()))?;

    match metadata.get("namespace").and_then(Value::as_str) {
        Some(namespace) if !namespace.is_empty() => Ok(format!("{namespace}/{name}")),
        _ => Ok(name.to_string()),
    }
}

/// Namespace of a serialized object, if it has one.
pub(crate) fn namespace_of(value: &Value) -> Option<&str> {
    value.pointer("/metadata/namespace").and_then(Value::as_str)
}
