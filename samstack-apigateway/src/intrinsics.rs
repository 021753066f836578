//! Template intrinsic resolution

use serde_json::Value;

/// Resolves references between template resources to logical ids
pub trait IntrinsicResolver {
    /// Logical id a property value refers to, if it can be determined locally
    fn logical_id(&self, value: &Value) -> Option<String>;
}

/// Understands plain logical id strings and `{"Ref": "LogicalId"}`
#[derive(Debug, Clone, Copy, Default)]
pub struct RefResolver;

impl IntrinsicResolver for RefResolver {
    fn logical_id(&self, value: &Value) -> Option<String> {
        match value {
            Value::String(id) => Some(id.clone()),
            Value::Object(map) if map.len() == 1 => {
                map.get("Ref").and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        }
    }
}
