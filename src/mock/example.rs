use crate::openapi::Schema;
use serde_json::{Map, Value};

/// Builds a payload from the declared `example` of every property.
///
/// Object-typed properties recurse; anything else is copied verbatim, `null` when no
/// example is declared. The root is always rendered as an object, so a scalar root
/// schema yields `{}`.
pub fn synthesize(schema: &Schema) -> Value {
    Value::Object(build_object(schema))
}

fn build_object(schema: &Schema) -> Map<String, Value> {
    schema
        .properties
        .iter()
        .map(|(name, property)| {
            let value = if property.is_object() {
                Value::Object(build_object(property))
            } else {
                property.example.clone().unwrap_or(Value::Null)
            };
            (name.clone(), value)
        })
        .collect()
}
