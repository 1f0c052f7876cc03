//! Client handle
//!
//! An [`EsiClient`] pairs a resolved [`SpecDocument`] with the runtime
//! collaborators (transport, cache, sleeper, clock) and a
//! [`TokenAuthenticator`]. Clones share everything but the authenticator
//! binding, which [`EsiClient::with_credential`] replaces.

use std::collections::BTreeMap;
use std::sync::Arc;

use esi_core::{CacheBackend, Clock, CredentialLifecycle, HttpTransport, Sleeper};
use esi_domain::constants::{DATASOURCE_PARAM, LANGUAGE_PARAM, PAGE_PARAM, TOKEN_PARAM, USER_AGENT_HEADER};
use esi_domain::{EsiError, EsiSettings, PreparedRequest, RequestConfig, Result};
use serde_json::Value;

use super::future::CachingRetryingFuture;
use crate::auth::{SharedCredential, TokenAuthenticator};
use crate::spec::{OperationSpec, ParameterLocation, ParameterSpec, SpecDocument};

/// Operation arguments by parameter name
pub type Params = BTreeMap<String, Value>;

/// Parameters the client fills in itself; accepted even when undeclared.
const MANAGED_PARAMS: &[&str] = &[DATASOURCE_PARAM, LANGUAGE_PARAM, PAGE_PARAM, TOKEN_PARAM];

pub(crate) struct ClientShared {
    pub(crate) spec: SpecDocument,
    pub(crate) settings: Arc<EsiSettings>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) cache: Arc<dyn CacheBackend>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) lifecycle: Option<Arc<dyn CredentialLifecycle>>,
    pub(crate) app_info: String,
    pub(crate) request_config: RequestConfig,
}

/// Handle for calling ESI operations
#[derive(Clone)]
pub struct EsiClient {
    pub(crate) shared: Arc<ClientShared>,
    pub(crate) authenticator: TokenAuthenticator,
}

impl std::fmt::Debug for EsiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiClient")
            .field("base_url", &self.shared.spec.base_url())
            .field("datasource", &self.authenticator.datasource())
            .field("authenticated", &self.authenticator.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl EsiClient {
    pub(crate) fn new(shared: ClientShared, authenticator: TokenAuthenticator) -> Self {
        Self { shared: Arc::new(shared), authenticator }
    }

    pub fn spec(&self) -> &SpecDocument {
        &self.shared.spec
    }

    pub fn settings(&self) -> &EsiSettings {
        &self.shared.settings
    }

    pub const fn authenticator(&self) -> &TokenAuthenticator {
        &self.authenticator
    }

    /// Same client acting for `credential`; the spec is not re-resolved.
    ///
    /// # Errors
    /// `EsiError::ClientConstruction` when the client was built without a
    /// credential lifecycle to refresh with.
    pub fn with_credential(&self, credential: SharedCredential) -> Result<Self> {
        let lifecycle = self.shared.lifecycle.clone().ok_or_else(|| {
            EsiError::ClientConstruction(
                "a credential lifecycle is required to bind credentials".to_string(),
            )
        })?;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            authenticator: self.authenticator.clone().with_credential(credential, lifecycle),
        })
    }

    #[must_use]
    pub fn without_credential(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            authenticator: self.authenticator.clone().without_credential(),
        }
    }

    #[must_use]
    pub fn with_datasource(&self, datasource: impl Into<String>) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            authenticator: self.authenticator.clone().with_datasource(datasource),
        }
    }

    /// Prepare `resource.operation_id` with `params`.
    ///
    /// Nothing is sent until a result method is awaited.
    ///
    /// # Errors
    /// `EsiError::UnknownOperation` for an unknown operation and
    /// `EsiError::InvalidParameter` for an undeclared or missing required
    /// parameter.
    pub fn call(
        &self,
        resource: &str,
        operation_id: &str,
        params: Params,
    ) -> Result<CachingRetryingFuture> {
        let operation = self.shared.spec.operation(resource, operation_id)?.clone();
        let request = build_request(&operation, &params, &self.shared.app_info)?;
        Ok(CachingRetryingFuture::new(self.clone(), operation, request, self.shared.request_config))
    }
}

fn build_request(
    operation: &OperationSpec,
    params: &Params,
    app_info: &str,
) -> Result<PreparedRequest> {
    let mut url = operation.url_template();
    let mut request = PreparedRequest::new(operation.method.clone(), String::new())
        .with_header(USER_AGENT_HEADER, app_info);

    for (name, value) in params {
        match operation.parameter(name) {
            Some(parameter) => {
                let rendered = render(value, parameter);
                match parameter.location {
                    ParameterLocation::Path => {
                        url = url.replace(&format!("{{{name}}}"), &urlencoding::encode(&rendered));
                    }
                    ParameterLocation::Query | ParameterLocation::FormData => {
                        request.params.insert(name.clone(), rendered);
                    }
                    ParameterLocation::Header => {
                        request.headers.insert(name.clone(), rendered);
                    }
                    ParameterLocation::Body => request.body = Some(value.clone()),
                }
            }
            None if MANAGED_PARAMS.contains(&name.as_str()) => {
                request.params.insert(name.clone(), render_plain(value, ","));
            }
            None => {
                return Err(EsiError::InvalidParameter(format!(
                    "{} has no parameter '{name}'",
                    operation.operation_id
                )));
            }
        }
    }

    if let Some(missing) = operation.parameters.iter().find(|p| {
        p.required && !params.contains_key(&p.name) && !MANAGED_PARAMS.contains(&p.name.as_str())
    }) {
        return Err(EsiError::InvalidParameter(format!(
            "{} requires parameter '{}'",
            operation.operation_id, missing.name
        )));
    }

    request.url = url;
    Ok(request)
}

fn render(value: &Value, parameter: &ParameterSpec) -> String {
    let separator = match parameter.collection_format.as_str() {
        "ssv" => " ",
        "tsv" => "\t",
        "pipes" => "|",
        _ => ",",
    };
    render_plain(value, separator)
}

fn render_plain(value: &Value, separator: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => {
            items.iter().map(|item| render_plain(item, separator)).collect::<Vec<_>>().join(separator)
        }
        other => other.to_string(),
    }
}
