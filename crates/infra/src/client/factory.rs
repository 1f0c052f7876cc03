//! Client construction
//!
//! [`EsiClientFactory`] owns the collaborators every client shares and turns
//! a [`ClientOptions`] into a ready [`EsiClient`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use esi_core::{CacheBackend, Clock, CredentialLifecycle, HttpTransport, Sleeper, SystemClock};
use esi_domain::{EsiError, EsiSettings, RequestConfig, Result};
use tracing::{info, instrument};

use super::handle::{ClientShared, EsiClient};
use crate::auth::{SharedCredential, TokenAuthenticator};
use crate::cache::{MokaCacheBackend, MokaCacheConfig};
use crate::http::ReqwestTransport;
use crate::spec::{SpecConfig, SpecDocument, SpecResolver};
use crate::time::TokioSleeper;

/// Per-client construction options
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub credential: Option<SharedCredential>,
    pub datasource: Option<String>,
    pub version: Option<String>,
    /// Read the document from disk instead of resolving it.
    pub spec_file: Option<PathBuf>,
    /// Resource name to API version overrides.
    pub resource_versions: BTreeMap<String, String>,
    /// Keep only these resources; `None` keeps all.
    pub resources: Option<Vec<String>>,
    pub spec_config: Option<SpecConfig>,
    pub app_info: Option<String>,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("authenticated", &self.credential.is_some())
            .field("datasource", &self.datasource)
            .field("version", &self.version)
            .field("spec_file", &self.spec_file)
            .field("resource_versions", &self.resource_versions)
            .field("resources", &self.resources)
            .field("app_info", &self.app_info)
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn credential(mut self, credential: SharedCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    #[must_use]
    pub fn datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = Some(datasource.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn spec_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.spec_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn resource_version(mut self, resource: impl Into<String>, version: impl Into<String>) -> Self {
        self.resource_versions.insert(resource.into(), version.into());
        self
    }

    #[must_use]
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn spec_config(mut self, config: SpecConfig) -> Self {
        self.spec_config = Some(config);
        self
    }

    #[must_use]
    pub fn app_info(mut self, app_info: impl Into<String>) -> Self {
        self.app_info = Some(app_info.into());
        self
    }
}

/// Builds clients sharing one transport, cache and credential lifecycle
#[derive(Clone)]
pub struct EsiClientFactory {
    settings: Arc<EsiSettings>,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheBackend>,
    lifecycle: Option<Arc<dyn CredentialLifecycle>>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EsiClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiClientFactory")
            .field("api_url", &self.settings.api_url)
            .field("lifecycle", &self.lifecycle.is_some())
            .finish_non_exhaustive()
    }
}

impl EsiClientFactory {
    /// Factory with the default reqwest transport, moka cache and tokio timer.
    ///
    /// # Errors
    /// `EsiError::Config` for invalid settings, `EsiError::ClientConstruction`
    /// when the HTTP client cannot be built.
    pub fn new(settings: EsiSettings) -> Result<Self> {
        settings.validate()?;
        let transport = ReqwestTransport::builder()
            .user_agent(settings.app_info.clone())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()?;
        let cache = MokaCacheBackend::new(MokaCacheConfig::from_settings(&settings));

        Ok(Self {
            settings: Arc::new(settings),
            transport: Arc::new(transport),
            cache: Arc::new(cache),
            lifecycle: None,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn CredentialLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EsiSettings {
        &self.settings
    }

    /// Resolver sharing this factory's transport and cache.
    pub fn resolver(&self) -> SpecResolver {
        SpecResolver::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.transport),
            Arc::clone(&self.cache),
        )
    }

    /// Resolve the document and build a client.
    ///
    /// # Errors
    /// `EsiError::SpecResolution` or `EsiError::Io` when the document cannot
    /// be obtained, `EsiError::ClientConstruction` for unknown resources or a
    /// credential without a lifecycle.
    #[instrument(skip(self, options), fields(version = tracing::field::Empty, authenticated = options.credential.is_some()))]
    pub async fn build(&self, options: ClientOptions) -> Result<EsiClient> {
        let spec = match &options.spec_file {
            Some(path) => self.resolver().read_spec_file(path, options.spec_config.clone())?,
            None => {
                let version = options.version.as_deref().unwrap_or(&self.settings.api_version);
                tracing::Span::current().record("version", version);
                self.resolver()
                    .build_spec(
                        version,
                        None,
                        &options.resource_versions,
                        options.resources.as_deref(),
                        options.spec_config.clone(),
                    )
                    .await?
            }
        };

        let client = self.assemble(spec, &options)?;
        info!(base_url = %client.spec().base_url(), "ESI client ready");
        Ok(client)
    }

    /// Client over a document read from disk.
    ///
    /// # Errors
    /// Same as [`SpecResolver::read_spec_file`].
    pub fn read_spec(&self, path: &Path) -> Result<EsiClient> {
        let spec = self.resolver().read_spec_file(path, None)?;
        self.assemble(spec, &ClientOptions::default())
    }

    fn assemble(&self, spec: SpecDocument, options: &ClientOptions) -> Result<EsiClient> {
        let request_config =
            RequestConfig { also_return_response: spec.config_flag("also_return_response") };

        let mut authenticator = TokenAuthenticator::new(&self.settings)
            .with_clock(Arc::clone(&self.clock))
            .with_datasource(
                options.datasource.clone().unwrap_or_else(|| self.settings.datasource.clone()),
            );
        if let Some(credential) = &options.credential {
            let lifecycle = self.lifecycle.clone().ok_or_else(|| {
                EsiError::ClientConstruction(
                    "a credential lifecycle is required to bind credentials".to_string(),
                )
            })?;
            authenticator = authenticator.with_credential(Arc::clone(credential), lifecycle);
        }

        let shared = ClientShared {
            spec,
            settings: Arc::clone(&self.settings),
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            sleeper: Arc::clone(&self.sleeper),
            clock: Arc::clone(&self.clock),
            lifecycle: self.lifecycle.clone(),
            app_info: options.app_info.clone().unwrap_or_else(|| self.settings.app_info.clone()),
            request_config,
        };
        Ok(EsiClient::new(shared, authenticator))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;
    use esi_domain::Credential;
    use serde_json::json;

    use super::*;
    use crate::auth::share;

    fn swagger() -> serde_json::Value {
        json!({
            "swagger": "2.0",
            "host": "esi.evetech.net",
            "basePath": "/latest",
            "schemes": ["https"],
            "paths": {
                "/status/": {
                    "get": {"operationId": "get_status", "tags": ["Status"], "responses": {"200": {"description": "ok"}}}
                }
            }
        })
    }

    fn spec_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(swagger().to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_spec_builds_unauthenticated_client() {
        let factory = EsiClientFactory::new(EsiSettings::default()).unwrap();
        let file = spec_file();

        let client = factory.read_spec(file.path()).unwrap();

        assert_eq!(client.spec().base_url(), "https://esi.evetech.net/latest");
        assert_eq!(client.authenticator().datasource(), "tranquility");
        assert!(!client.authenticator().is_authenticated());
        assert!(client.call("Status", "get_status", Default::default()).is_ok());
    }

    #[tokio::test]
    async fn credential_without_lifecycle_is_rejected() {
        let factory = EsiClientFactory::new(EsiSettings::default()).unwrap();
        let file = spec_file();
        let credential = share(Credential::new(1, "Pilot", "access", None, Utc::now()));

        let err = factory
            .build(ClientOptions::new().spec_file(file.path()).credential(credential))
            .await
            .unwrap_err();

        assert!(matches!(err, EsiError::ClientConstruction(_)));
    }

    #[tokio::test]
    async fn spec_config_enables_response_passthrough() {
        let factory = EsiClientFactory::new(EsiSettings::default()).unwrap();
        let file = spec_file();
        let config: SpecConfig =
            [("also_return_response".to_string(), json!(true))].into_iter().collect();

        let client = factory
            .build(
                ClientOptions::new().spec_file(file.path()).spec_config(config).datasource("singularity"),
            )
            .await
            .unwrap();

        let future = client.call("Status", "get_status", Default::default()).unwrap();
        assert!(future.request_config.also_return_response);
        assert_eq!(client.authenticator().datasource(), "singularity");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = EsiSettings { languages: Vec::new(), ..EsiSettings::default() };
        assert!(matches!(EsiClientFactory::new(settings), Err(EsiError::Config(_))));
    }
}
