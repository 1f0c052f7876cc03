//! EVE SSO refresh-token grant
//!
//! Implements [`CredentialLifecycle`] against the SSO v2 token endpoint:
//! - HTTP Basic client authentication
//! - OAuth error codes mapped to [`RefreshFailure`]
//! - Refreshed credentials persisted through a [`CredentialStore`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use esi_core::{Clock, CredentialLifecycle, CredentialStore, SystemClock};
use esi_domain::constants::CURRENT_SSO_VERSION;
use esi_domain::{Credential, EsiError, EsiSettings, RefreshFailure, Result};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// OAuth2 error body
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Refreshes credentials with the SSO token endpoint.
pub struct SsoLifecycle {
    http: ReqwestClient,
    token_url: String,
    client_id: String,
    client_secret: String,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    valid_duration: Duration,
}

impl SsoLifecycle {
    /// Build from settings.
    ///
    /// # Errors
    /// `EsiError::Config` when the SSO client id or secret is not configured.
    pub fn new(settings: &EsiSettings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client_id = settings
            .sso_client_id
            .clone()
            .ok_or_else(|| EsiError::Config("sso_client_id is not configured".to_string()))?;
        let client_secret = settings
            .sso_client_secret
            .clone()
            .ok_or_else(|| EsiError::Config("sso_client_secret is not configured".to_string()))?;

        let http = ReqwestClient::builder()
            .user_agent(settings.app_info.clone())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.read_timeout_secs))
            .build()
            .map_err(|e| EsiError::ClientConstruction(format!("cannot build SSO client: {e}")))?;

        Ok(Self {
            http,
            token_url: settings.sso_token_url.clone(),
            client_id,
            client_secret,
            store,
            clock: Arc::new(SystemClock),
            valid_duration: settings.token_valid_duration(),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the refresh-token grant and return the new token pair.
    async fn exchange(&self, refresh_token: &str) -> Result<(String, Option<String>)> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| refresh_error(RefreshFailure::Transport, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| refresh_error(RefreshFailure::Transport, e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(oauth) => refresh_error(
                    RefreshFailure::from_oauth_code(&oauth.error),
                    oauth.error_description.unwrap_or(oauth.error),
                ),
                Err(_) => refresh_error(
                    RefreshFailure::Transport,
                    format!("SSO answered HTTP {}", status.as_u16()),
                ),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            refresh_error(RefreshFailure::IncompleteResponse, format!("unreadable token response: {e}"))
        })?;
        let access_token = parsed.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            refresh_error(RefreshFailure::IncompleteResponse, "response has no access_token".into())
        })?;
        Ok((access_token, parsed.refresh_token.filter(|t| !t.is_empty())))
    }
}

fn refresh_error(kind: RefreshFailure, message: String) -> EsiError {
    EsiError::TokenRefresh { kind, message }
}

#[async_trait]
impl CredentialLifecycle for SsoLifecycle {
    #[instrument(skip_all, fields(character_id = credential.character_id))]
    async fn refresh(&self, credential: &mut Credential) -> Result<()> {
        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(EsiError::TokenExpired { character_id: credential.character_id });
        };

        let (access_token, rotated) = match self.exchange(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "SSO refresh failed");
                return Err(err);
            }
        };

        credential.access_token = access_token;
        if let Some(rotated) = rotated {
            credential.refresh_token = Some(rotated);
        }
        credential.created = self.clock.now();
        credential.sso_version = CURRENT_SSO_VERSION;

        self.store.save(credential).await?;
        info!("Refreshed SSO credential");
        Ok(())
    }

    async fn discard(&self, credential: &Credential) -> Result<()> {
        self.store.delete(credential.id).await
    }

    fn valid_duration(&self) -> Duration {
        self.valid_duration
    }
}
