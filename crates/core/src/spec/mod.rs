//! Swagger 2.0 document helpers
//!
//! Documents are handled as raw `serde_json::Value` trees. Operations are
//! grouped into resources by their first tag.

pub mod minimize;
pub mod validate;

use std::collections::BTreeSet;

use serde_json::Value;

pub use minimize::minimize_spec;
pub use validate::validate_spec;

/// Path item keys that hold operations.
pub const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Sections whose entries are only kept when referenced.
pub const REFERENCE_SECTIONS: &[&str] = &["definitions", "parameters", "responses"];

/// Resource an operation belongs to: its first tag, or `default`.
pub fn operation_resource(operation: &Value) -> String {
    operation
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.first())
        .and_then(Value::as_str)
        .unwrap_or("default")
        .to_string()
}

/// Every resource name declared by the document's operations.
pub fn resource_names(spec: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for (_, item) in paths(spec) {
        for (_, operation) in operations(item) {
            names.insert(operation_resource(operation));
        }
    }
    names
}

/// `(path, path item)` pairs.
pub fn paths(spec: &Value) -> impl Iterator<Item = (&String, &Value)> {
    spec.get("paths").and_then(Value::as_object).into_iter().flatten()
}

/// `(method, operation)` pairs of a path item.
pub fn operations(item: &Value) -> impl Iterator<Item = (&'static str, &Value)> {
    HTTP_METHODS.iter().filter_map(move |method| item.get(*method).map(|op| (*method, op)))
}

/// Collect every `$ref` string under `value`.
pub fn collect_refs(value: &Value, refs: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "$ref" {
                    if let Some(target) = child.as_str() {
                        refs.insert(target.to_string());
                    }
                } else {
                    collect_refs(child, refs);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, refs);
            }
        }
        _ => {}
    }
}

/// Resolve a local `#/...` reference.
pub fn resolve_ref<'a>(spec: &'a Value, reference: &str) -> Option<&'a Value> {
    reference.strip_prefix('#').and_then(|pointer| spec.pointer(pointer))
}

/// `(section, entry name)` of a local reference such as
/// `#/definitions/contract`.
pub fn split_ref(reference: &str) -> Option<(&str, String)> {
    let rest = reference.strip_prefix("#/")?;
    let (section, name) = rest.split_once('/')?;
    Some((section, name.replace("~1", "/").replace("~0", "~")))
}
