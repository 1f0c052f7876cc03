//! Document minimization
//!
//! Keeps only the operations a client needs plus the transitive closure of
//! the definitions, parameters and responses they reference.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::{
    collect_refs, operation_resource, operations, paths, resolve_ref, split_ref, HTTP_METHODS,
    REFERENCE_SECTIONS,
};

/// Return a reduced copy of `spec`.
///
/// An operation is kept when its first tag is in `resources` or its id is
/// in `operation_ids`; with neither filter every operation is kept. Path
/// items left without operations are dropped. The input is never modified.
pub fn minimize_spec(
    spec: &Value,
    resources: Option<&[String]>,
    operation_ids: Option<&[String]>,
) -> Value {
    let mut kept_paths = Map::new();
    for (path, item) in paths(spec) {
        let mut kept_item = Map::new();
        for (method, operation) in operations(item) {
            if keeps(operation, resources, operation_ids) {
                kept_item.insert(method.to_string(), operation.clone());
            }
        }
        if kept_item.is_empty() {
            continue;
        }
        // Path-level keys such as shared parameters stay with the item.
        if let Some(item) = item.as_object() {
            for (key, value) in item {
                if !HTTP_METHODS.contains(&key.as_str()) {
                    kept_item.insert(key.clone(), value.clone());
                }
            }
        }
        kept_paths.insert(path.clone(), Value::Object(kept_item));
    }

    let kept_paths = Value::Object(kept_paths);
    let reachable = reachable_refs(spec, &kept_paths);

    let mut minimized = Map::new();
    if let Some(top) = spec.as_object() {
        for (key, value) in top {
            if key == "paths" {
                minimized.insert(key.clone(), kept_paths.clone());
            } else if REFERENCE_SECTIONS.contains(&key.as_str()) {
                minimized.insert(key.clone(), prune_section(key, value, &reachable));
            } else {
                minimized.insert(key.clone(), value.clone());
            }
        }
    }

    debug!(
        resources = ?resources,
        operations = ?operation_ids,
        references = reachable.len(),
        "Minimized swagger document"
    );
    Value::Object(minimized)
}

fn keeps(operation: &Value, resources: Option<&[String]>, operation_ids: Option<&[String]>) -> bool {
    if resources.is_none() && operation_ids.is_none() {
        return true;
    }
    let by_resource =
        resources.is_some_and(|wanted| wanted.contains(&operation_resource(operation)));
    let by_id = operation_ids.is_some_and(|wanted| {
        operation
            .get("operationId")
            .and_then(Value::as_str)
            .is_some_and(|id| wanted.iter().any(|w| w == id))
    });
    by_resource || by_id
}

/// Walk references outward from the kept paths.
fn reachable_refs(spec: &Value, kept_paths: &Value) -> BTreeSet<String> {
    let mut pending = BTreeSet::new();
    collect_refs(kept_paths, &mut pending);

    let mut seen = BTreeSet::new();
    while let Some(reference) = pending.pop_first() {
        if !seen.insert(reference.clone()) {
            continue;
        }
        if let Some(target) = resolve_ref(spec, &reference) {
            let mut nested = BTreeSet::new();
            collect_refs(target, &mut nested);
            pending.extend(nested.into_iter().filter(|r| !seen.contains(r)));
        }
    }
    seen
}

fn prune_section(section: &str, value: &Value, reachable: &BTreeSet<String>) -> Value {
    let Some(entries) = value.as_object() else {
        return value.clone();
    };
    let wanted: BTreeSet<String> = reachable
        .iter()
        .filter_map(|r| split_ref(r))
        .filter(|(s, _)| *s == section)
        .map(|(_, name)| name)
        .collect();
    Value::Object(
        entries
            .iter()
            .filter(|(name, _)| wanted.contains(*name))
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_spec() -> Value {
        json!({
            "swagger": "2.0",
            "host": "esi.evetech.net",
            "basePath": "/latest",
            "paths": {
                "/status/": {
                    "get": {
                        "operationId": "get_status",
                        "tags": ["Status"],
                        "parameters": [{"$ref": "#/parameters/datasource"}],
                        "responses": {"200": {"schema": {"$ref": "#/definitions/status"}}}
                    }
                },
                "/contracts/public/{region_id}/": {
                    "parameters": [{"name": "region_id", "in": "path", "required": true, "type": "integer"}],
                    "get": {
                        "operationId": "get_contracts_public_region_id",
                        "tags": ["Contracts"],
                        "parameters": [{"$ref": "#/parameters/page"}],
                        "responses": {
                            "200": {"schema": {"type": "array", "items": {"$ref": "#/definitions/contract"}}},
                            "404": {"$ref": "#/responses/not_found"}
                        }
                    }
                }
            },
            "definitions": {
                "status": {"type": "object", "properties": {"players": {"type": "integer"}}},
                "contract": {"type": "object", "properties": {"issuer": {"$ref": "#/definitions/issuer"}}},
                "issuer": {"type": "object"},
                "unused": {"type": "object"}
            },
            "parameters": {
                "datasource": {"name": "datasource", "in": "query", "type": "string"},
                "page": {"name": "page", "in": "query", "type": "integer"}
            },
            "responses": {
                "not_found": {"description": "Not found", "schema": {"$ref": "#/definitions/error"}}
            }
        })
    }

    #[test]
    fn keeps_only_requested_resource_and_its_closure() {
        let spec = sample_spec();
        let minimized = minimize_spec(&spec, Some(&["Contracts".to_string()]), None);

        let paths = minimized["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.contains_key("/contracts/public/{region_id}/"));

        let definitions = minimized["definitions"].as_object().unwrap();
        assert!(definitions.contains_key("contract"));
        assert!(definitions.contains_key("issuer"), "nested reference kept");
        assert!(!definitions.contains_key("status"));
        assert!(!definitions.contains_key("unused"));

        let parameters = minimized["parameters"].as_object().unwrap();
        assert!(parameters.contains_key("page"));
        assert!(!parameters.contains_key("datasource"));

        assert!(minimized["responses"].as_object().unwrap().contains_key("not_found"));
        assert_eq!(minimized["host"], "esi.evetech.net");
        assert_eq!(
            minimized["paths"]["/contracts/public/{region_id}/"]["parameters"][0]["name"],
            "region_id"
        );
    }

    #[test]
    fn filters_by_operation_id() {
        let spec = sample_spec();
        let minimized = minimize_spec(&spec, None, Some(&["get_status".to_string()]));
        let paths = minimized["paths"].as_object().unwrap();
        assert_eq!(paths.keys().collect::<Vec<_>>(), vec!["/status/"]);
        assert!(minimized["definitions"].as_object().unwrap().contains_key("status"));
    }

    #[test]
    fn resource_and_operation_filters_combine() {
        let spec = sample_spec();
        let minimized = minimize_spec(
            &spec,
            Some(&["Contracts".to_string()]),
            Some(&["get_status".to_string()]),
        );
        assert_eq!(minimized["paths"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn no_filters_prunes_only_unreferenced_entries() {
        let spec = sample_spec();
        let minimized = minimize_spec(&spec, None, None);
        assert_eq!(minimized["paths"].as_object().unwrap().len(), 2);
        assert!(!minimized["definitions"].as_object().unwrap().contains_key("unused"));
    }

    #[test]
    fn input_is_left_untouched() {
        let spec = sample_spec();
        let before = spec.clone();
        let _ = minimize_spec(&spec, Some(&["Status".to_string()]), None);
        assert_eq!(spec, before);
    }
}
