//! Swagger document resolution
//!
//! Fetches `{api_url}{version}/swagger.json`, caches the raw JSON for the
//! configured spec cache duration and parses it into a [`SpecDocument`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use esi_core::{minimize_spec, spec_cache_name, validate_spec, CacheBackend, HttpTransport};
use esi_domain::constants::{SPEC_FILENAME, USER_AGENT_HEADER};
use esi_domain::{EsiError, EsiSettings, PreparedRequest, Result};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::document::SpecDocument;

/// Parser configuration overlay
pub type SpecConfig = BTreeMap<String, Value>;

/// Resolves, caches and parses Swagger documents
#[derive(Clone)]
pub struct SpecResolver {
    settings: Arc<EsiSettings>,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheBackend>,
}

impl SpecResolver {
    pub fn new(
        settings: Arc<EsiSettings>,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheBackend>,
    ) -> Self {
        Self { settings, transport, cache }
    }

    /// Cache entry name for a document.
    pub fn cache_name(name: &str) -> String {
        spec_cache_name(name)
    }

    /// `{api_url}{version}/swagger.json`
    pub fn spec_url(&self, version: &str) -> String {
        format!("{}{version}/{SPEC_FILENAME}", self.settings.api_base())
    }

    fn fallback_base(&self, version: &str) -> String {
        format!("{}{version}", self.settings.api_base())
    }

    /// Parsed document for `version`, from cache when unexpired.
    ///
    /// # Errors
    /// `EsiError::SpecResolution` when the document cannot be fetched or
    /// fails validation.
    pub async fn get_spec(
        &self,
        version: &str,
        transport: Option<&dyn HttpTransport>,
        config: Option<SpecConfig>,
    ) -> Result<SpecDocument> {
        let raw = self.get_raw_spec(version, transport).await?;
        SpecDocument::parse(raw, config, &self.fallback_base(version))
    }

    /// Raw JSON for `version`, from cache when unexpired.
    ///
    /// # Errors
    /// `EsiError::SpecResolution` on network, status or parse failure.
    #[instrument(skip(self, transport))]
    pub async fn get_raw_spec(
        &self,
        version: &str,
        transport: Option<&dyn HttpTransport>,
    ) -> Result<Value> {
        let url = self.spec_url(version);
        let name = Self::cache_name(&url);
        if let Some(raw) = self.cached(&name).await {
            debug!(version, "Swagger document served from cache");
            return Ok(raw);
        }

        let request = PreparedRequest::new("GET", url.clone())
            .with_header(USER_AGENT_HEADER, self.settings.app_info.clone());
        let transport = transport.unwrap_or(self.transport.as_ref());
        let response = transport
            .execute(&request, self.settings.default_timeout())
            .await
            .map_err(|err| EsiError::SpecResolution(format!("cannot fetch {url}: {err}")))?;

        if !response.is_success() {
            return Err(EsiError::SpecResolution(format!(
                "fetching {url} returned HTTP {}",
                response.status
            )));
        }
        let raw: Value = serde_json::from_str(&response.body)
            .map_err(|err| EsiError::SpecResolution(format!("{url} is not valid JSON: {err}")))?;

        if let Err(err) =
            self.cache.set(&name, response.body, self.settings.spec_cache_duration()).await
        {
            warn!(key = %name, error = %err, "Failed to cache swagger document");
        }
        info!(version, url = %url, "Fetched swagger document");
        Ok(raw)
    }

    async fn cached(&self, name: &str) -> Option<Value> {
        match self.cache.get(name).await {
            Ok(Some(body)) => match serde_json::from_str(&body) {
                Ok(raw) => Some(raw),
                Err(err) => {
                    warn!(key = %name, error = %err, "Discarding unreadable cached swagger document");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key = %name, error = %err, "Swagger cache lookup failed");
                None
            }
        }
    }

    /// Document for `version` minimized to `resources` (all when `None`),
    /// with the resources named in `resource_versions` taken from their own
    /// version's document.
    ///
    /// # Errors
    /// `EsiError::ClientConstruction` when a requested or overridden resource
    /// is not in the base document or its override document;
    /// `EsiError::SpecResolution` when a document cannot be resolved.
    #[instrument(skip(self, transport, config))]
    pub async fn build_spec(
        &self,
        version: &str,
        transport: Option<&dyn HttpTransport>,
        resource_versions: &BTreeMap<String, String>,
        resources: Option<&[String]>,
        config: Option<SpecConfig>,
    ) -> Result<SpecDocument> {
        let raw = self.get_raw_spec(version, transport).await?;
        let available = esi_core::spec::resource_names(&raw);

        let wanted = resources.map(|names| {
            names.iter().map(|name| canonical_resource(&available, name)).collect::<Vec<_>>()
        });
        for name in resource_versions.keys().chain(resources.into_iter().flatten()) {
            if !available.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                return Err(EsiError::ClientConstruction(format!(
                    "resource '{name}' does not exist in the {version} swagger document"
                )));
            }
        }

        let minimized = minimize_spec(&raw, wanted.as_deref(), None);
        validate_spec(&minimized)?;
        let mut document =
            SpecDocument::parse(minimized, config.clone(), &self.fallback_base(version))?;

        for (resource, resource_version) in resource_versions {
            let name = canonical_resource(&available, resource);
            let other_raw = self.get_raw_spec(resource_version, transport).await?;
            let other = SpecDocument::parse(
                minimize_spec(&other_raw, Some(std::slice::from_ref(&name)), None),
                config.clone(),
                &self.fallback_base(resource_version),
            )?;
            document = document.with_resource_from(&other, &name)?;
            debug!(resource = %name, version = %resource_version, "Resource version overridden");
        }

        Ok(document)
    }

    /// Parse a document from disk. No network, no cache.
    ///
    /// # Errors
    /// `EsiError::Io` when the file cannot be read, `EsiError::SpecResolution`
    /// when it is not a valid document.
    pub fn read_spec_file(&self, path: &Path, config: Option<SpecConfig>) -> Result<SpecDocument> {
        let contents = std::fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&contents).map_err(|err| {
            EsiError::SpecResolution(format!("{} is not valid JSON: {err}", path.display()))
        })?;
        SpecDocument::parse(raw, config, &self.fallback_base(&self.settings.api_version))
    }
}

/// Name as declared in the document, falling back to the requested spelling.
fn canonical_resource(available: &std::collections::BTreeSet<String>, name: &str) -> String {
    available
        .iter()
        .find(|a| a.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}
