//! Structural validation of a Swagger document

use std::collections::BTreeSet;

use esi_domain::{EsiError, Result};
use serde_json::Value;

use super::{collect_refs, operations, paths, resolve_ref};

/// Check that `spec` is a usable Swagger 2.0 document.
///
/// # Errors
/// Returns `EsiError::SpecResolution` when the version marker or `paths`
/// object is missing, an operation has no `operationId`, an operation id is
/// declared twice, or a `$ref` does not resolve inside the document.
pub fn validate_spec(spec: &Value) -> Result<()> {
    let version = spec.get("swagger").and_then(Value::as_str);
    if version != Some("2.0") {
        return Err(EsiError::SpecResolution(format!(
            "unsupported swagger version: {}",
            version.unwrap_or("<missing>")
        )));
    }
    if !spec.get("paths").is_some_and(Value::is_object) {
        return Err(EsiError::SpecResolution("document has no paths object".to_string()));
    }

    let mut seen_ids = BTreeSet::new();
    for (path, item) in paths(spec) {
        for (method, operation) in operations(item) {
            let id = operation.get("operationId").and_then(Value::as_str).ok_or_else(|| {
                EsiError::SpecResolution(format!("{} {path} has no operationId", method.to_uppercase()))
            })?;
            if !seen_ids.insert(id) {
                return Err(EsiError::SpecResolution(format!("duplicate operationId '{id}'")));
            }
        }
    }

    let mut refs = BTreeSet::new();
    collect_refs(spec, &mut refs);
    for reference in &refs {
        if resolve_ref(spec, reference).is_none() {
            return Err(EsiError::SpecResolution(format!("unresolved reference '{reference}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spec_with(definitions: Value) -> Value {
        json!({
            "swagger": "2.0",
            "paths": {
                "/status/": {
                    "get": {
                        "operationId": "get_status",
                        "tags": ["Status"],
                        "responses": {"200": {"schema": {"$ref": "#/definitions/status"}}}
                    }
                }
            },
            "definitions": definitions
        })
    }

    #[test]
    fn accepts_resolvable_document() {
        let spec = spec_with(json!({"status": {"type": "object"}}));
        assert!(validate_spec(&spec).is_ok());
    }

    #[test]
    fn rejects_dangling_reference() {
        let spec = spec_with(json!({}));
        let err = validate_spec(&spec).unwrap_err();
        assert!(matches!(err, EsiError::SpecResolution(msg) if msg.contains("#/definitions/status")));
    }

    #[test]
    fn rejects_missing_version_and_paths() {
        assert!(validate_spec(&json!({"paths": {}})).is_err());
        assert!(validate_spec(&json!({"swagger": "2.0"})).is_err());
    }

    #[test]
    fn rejects_operation_without_id() {
        let spec = json!({
            "swagger": "2.0",
            "paths": {"/status/": {"get": {"responses": {}}}}
        });
        assert!(matches!(validate_spec(&spec), Err(EsiError::SpecResolution(_))));
    }
}
