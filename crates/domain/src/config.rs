//! Client settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_API_VERSION, DEFAULT_BACKOFF_FACTOR, DEFAULT_CACHE_MAX_CAPACITY,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DATASOURCE, DEFAULT_LANGUAGES, DEFAULT_MAX_RETRIES,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_SPEC_CACHE_DURATION_SECS, DEFAULT_SSO_TOKEN_URL,
    DEFAULT_TOKEN_VALID_DURATION_SECS,
};
use crate::errors::{EsiError, Result};
use crate::types::RequestTimeout;

/// Every tunable the client reads.
///
/// Missing keys in a config file fall back to [`EsiSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsiSettings {
    pub api_url: String,
    pub datasource: String,
    pub api_version: String,
    pub spec_cache_duration_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub server_error_backoff_factor: f64,
    pub server_error_max_retries: u32,
    pub languages: Vec<String>,
    pub token_valid_duration_secs: u64,
    pub sso_client_id: Option<String>,
    pub sso_client_secret: Option<String>,
    pub sso_token_url: String,
    pub cache_max_capacity: u64,
    pub app_info: String,
}

impl Default for EsiSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            datasource: DEFAULT_DATASOURCE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            spec_cache_duration_secs: DEFAULT_SPEC_CACHE_DURATION_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            server_error_backoff_factor: DEFAULT_BACKOFF_FACTOR,
            server_error_max_retries: DEFAULT_MAX_RETRIES,
            languages: DEFAULT_LANGUAGES.iter().map(ToString::to_string).collect(),
            token_valid_duration_secs: DEFAULT_TOKEN_VALID_DURATION_SECS,
            sso_client_id: None,
            sso_client_secret: None,
            sso_token_url: DEFAULT_SSO_TOKEN_URL.to_string(),
            cache_max_capacity: DEFAULT_CACHE_MAX_CAPACITY,
            app_info: format!("esi-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EsiSettings {
    /// Base URL guaranteed to end with a slash.
    pub fn api_base(&self) -> String {
        if self.api_url.ends_with('/') {
            self.api_url.clone()
        } else {
            format!("{}/", self.api_url)
        }
    }

    pub const fn spec_cache_duration(&self) -> Duration {
        Duration::from_secs(self.spec_cache_duration_secs)
    }

    /// Connect/read pair applied when a call does not override it.
    pub const fn default_timeout(&self) -> RequestTimeout {
        RequestTimeout::Pair {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }

    pub const fn token_valid_duration(&self) -> Duration {
        Duration::from_secs(self.token_valid_duration_secs)
    }

    /// Whether `language` is one of the configured languages.
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    /// Returns `EsiError::Config` for a non-http(s) API URL, an empty
    /// language list, or a negative or non-finite backoff factor.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(EsiError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.languages.is_empty() {
            return Err(EsiError::Config("languages must not be empty".to_string()));
        }
        if !self.server_error_backoff_factor.is_finite() || self.server_error_backoff_factor < 0.0
        {
            return Err(EsiError::Config(format!(
                "server_error_backoff_factor must be a non-negative number, got {}",
                self.server_error_backoff_factor
            )));
        }
        if self.datasource.is_empty() {
            return Err(EsiError::Config("datasource must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = EsiSettings::default();
        assert_eq!(settings.api_url, "https://esi.evetech.net/");
        assert_eq!(settings.datasource, "tranquility");
        assert_eq!(settings.server_error_max_retries, 3);
        assert_eq!(settings.languages.len(), 8);
        assert_eq!(
            settings.default_timeout(),
            RequestTimeout::Pair { connect: Duration::from_secs(5), read: Duration::from_secs(30) }
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn api_base_appends_slash() {
        let settings =
            EsiSettings { api_url: "http://localhost:8080".to_string(), ..Default::default() };
        assert_eq!(settings.api_base(), "http://localhost:8080/");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad_url = EsiSettings { api_url: "ftp://esi".to_string(), ..Default::default() };
        assert!(matches!(bad_url.validate(), Err(EsiError::Config(_))));

        let no_languages = EsiSettings { languages: vec![], ..Default::default() };
        assert!(matches!(no_languages.validate(), Err(EsiError::Config(_))));

        let negative_backoff =
            EsiSettings { server_error_backoff_factor: -0.5, ..Default::default() };
        assert!(matches!(negative_backoff.validate(), Err(EsiError::Config(_))));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: EsiSettings =
            serde_json::from_str(r#"{"datasource": "singularity"}"#).unwrap();
        assert_eq!(settings.datasource, "singularity");
        assert_eq!(settings.api_version, "latest");
    }
}
