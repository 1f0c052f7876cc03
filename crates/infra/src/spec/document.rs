//! Parsed Swagger document
//!
//! A [`SpecDocument`] is an immutable snapshot: operations grouped by
//! resource, each resolved to its base URL and parameter list, plus the
//! parser configuration it was built with.

use std::collections::BTreeMap;
use std::sync::Arc;

use esi_core::spec::{operation_resource, operations, paths, resolve_ref, validate_spec};
use esi_domain::{EsiError, Result};
use serde_json::{json, Value};

/// Where a parameter travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    FormData,
}

impl ParameterLocation {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// `csv` unless the document says otherwise
    pub collection_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub operation_id: String,
    pub resource: String,
    /// Upper-case HTTP method
    pub method: String,
    /// Path template, e.g. `/characters/{character_id}/`
    pub path: String,
    pub base_url: String,
    pub parameters: Vec<ParameterSpec>,
}

impl OperationSpec {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Full URL with the path template still unexpanded.
    pub fn url_template(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub operations: BTreeMap<String, OperationSpec>,
}

/// Immutable, parsed Swagger document
#[derive(Debug, Clone)]
pub struct SpecDocument {
    raw: Arc<Value>,
    base_url: String,
    resources: BTreeMap<String, Resource>,
    config: BTreeMap<String, Value>,
}

/// Parser options every document starts with.
pub fn default_config() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("use_models".to_string(), json!(false)),
        ("validate_responses".to_string(), json!(false)),
        ("also_return_response".to_string(), json!(false)),
    ])
}

impl SpecDocument {
    /// Validate and parse `raw`.
    ///
    /// `overlay` is merged over [`default_config`]. `fallback_base` is used
    /// when the document declares no `host`.
    ///
    /// # Errors
    /// `EsiError::SpecResolution` when the document fails validation.
    pub fn parse(
        raw: Value,
        overlay: Option<BTreeMap<String, Value>>,
        fallback_base: &str,
    ) -> Result<Self> {
        validate_spec(&raw)?;

        let base_url = base_url(&raw, fallback_base);
        let mut resources: BTreeMap<String, Resource> = BTreeMap::new();
        for (path, item) in paths(&raw) {
            let shared = item.get("parameters");
            for (method, operation) in operations(item) {
                let spec = OperationSpec {
                    operation_id: operation
                        .get("operationId")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    resource: operation_resource(operation),
                    method: method.to_ascii_uppercase(),
                    path: path.clone(),
                    base_url: base_url.clone(),
                    parameters: parameters(&raw, shared, operation.get("parameters")),
                };
                resources
                    .entry(spec.resource.clone())
                    .or_insert_with(|| Resource {
                        name: spec.resource.clone(),
                        operations: BTreeMap::new(),
                    })
                    .operations
                    .insert(spec.operation_id.clone(), spec);
            }
        }

        let mut config = default_config();
        config.extend(overlay.unwrap_or_default());

        Ok(Self { raw: Arc::new(raw), base_url, resources, config })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.config
    }

    /// Look up a parser option by name.
    pub fn config_value(&self, name: &str) -> Option<&Value> {
        self.config.get(name)
    }

    pub fn config_flag(&self, name: &str) -> bool {
        self.config_value(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Resource by name; exact match first, then case-insensitive.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name).or_else(|| {
            self.resources.values().find(|resource| resource.name.eq_ignore_ascii_case(name))
        })
    }

    /// # Errors
    /// `EsiError::UnknownOperation` when the resource or operation is absent.
    pub fn operation(&self, resource: &str, operation_id: &str) -> Result<&OperationSpec> {
        self.resource(resource)
            .and_then(|r| r.operations.get(operation_id))
            .ok_or_else(|| EsiError::UnknownOperation(format!("{resource}.{operation_id}")))
    }

    /// Replace resource `name` with the one from `other`, keeping `other`'s
    /// base URL for its operations.
    ///
    /// # Errors
    /// `EsiError::ClientConstruction` when either document lacks the resource.
    pub fn with_resource_from(mut self, other: &Self, name: &str) -> Result<Self> {
        let key = self
            .resource(name)
            .map(|r| r.name.clone())
            .ok_or_else(|| EsiError::ClientConstruction(format!("resource '{name}' not found")))?;
        let replacement = other.resource(name).cloned().ok_or_else(|| {
            EsiError::ClientConstruction(format!(
                "resource '{name}' not found in {}",
                other.base_url
            ))
        })?;
        self.resources.insert(key, replacement);
        Ok(self)
    }
}

fn base_url(raw: &Value, fallback: &str) -> String {
    let Some(host) = raw.get("host").and_then(Value::as_str) else {
        return fallback.trim_end_matches('/').to_string();
    };
    let scheme = raw
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| schemes.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = raw.get("basePath").and_then(Value::as_str).unwrap_or("");
    format!("{scheme}://{host}{}", base_path.trim_end_matches('/'))
}

/// Merge path-level and operation-level parameters, resolving references.
/// Operation entries win over path entries with the same name and location.
fn parameters(raw: &Value, shared: Option<&Value>, own: Option<&Value>) -> Vec<ParameterSpec> {
    let mut merged: Vec<ParameterSpec> = Vec::new();
    for list in [shared, own].into_iter().flatten() {
        for entry in list.as_array().into_iter().flatten() {
            let entry = match entry.get("$ref").and_then(Value::as_str) {
                Some(reference) => match resolve_ref(raw, reference) {
                    Some(target) => target,
                    None => continue,
                },
                None => entry,
            };
            let Some(parameter) = parameter(entry) else {
                continue;
            };
            merged.retain(|p| !(p.name == parameter.name && p.location == parameter.location));
            merged.push(parameter);
        }
    }
    merged
}

fn parameter(entry: &Value) -> Option<ParameterSpec> {
    let name = entry.get("name").and_then(Value::as_str)?;
    let location = ParameterLocation::parse(entry.get("in").and_then(Value::as_str)?)?;
    Some(ParameterSpec {
        name: name.to_string(),
        location,
        required: location == ParameterLocation::Path
            || entry.get("required").and_then(Value::as_bool).unwrap_or(false),
        collection_format: entry
            .get("collectionFormat")
            .and_then(Value::as_str)
            .unwrap_or("csv")
            .to_string(),
    })
}
