//! Per-request token decoration

use std::sync::Arc;
use std::time::Duration;

use esi_core::{Clock, CredentialLifecycle, SystemClock};
use esi_domain::constants::DATASOURCE_PARAM;
use esi_domain::{EsiError, EsiSettings, PreparedRequest, Result};
use tracing::{debug, info};

use super::SharedCredential;

#[derive(Clone)]
struct Binding {
    credential: SharedCredential,
    lifecycle: Arc<dyn CredentialLifecycle>,
}

/// Binds zero or one credential and a datasource to outgoing requests.
///
/// Cloning is cheap; clones share the bound credential.
#[derive(Clone)]
pub struct TokenAuthenticator {
    binding: Option<Binding>,
    datasource: String,
    valid_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenAuthenticator {
    /// Unauthenticated authenticator using the configured datasource.
    pub fn new(settings: &EsiSettings) -> Self {
        Self {
            binding: None,
            datasource: settings.datasource.clone(),
            valid_duration: settings.token_valid_duration(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_credential(
        mut self,
        credential: SharedCredential,
        lifecycle: Arc<dyn CredentialLifecycle>,
    ) -> Self {
        self.binding = Some(Binding { credential, lifecycle });
        self
    }

    #[must_use]
    pub fn without_credential(mut self) -> Self {
        self.binding = None;
        self
    }

    #[must_use]
    pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = datasource.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    pub const fn is_authenticated(&self) -> bool {
        self.binding.is_some()
    }

    /// Identity used to partition cached responses.
    pub async fn principal(&self) -> Option<String> {
        match &self.binding {
            Some(binding) => Some(binding.credential.lock().await.character_id.to_string()),
            None => None,
        }
    }

    /// Return `request` with datasource and authorization applied.
    ///
    /// An expired credential is refreshed (and persisted by the lifecycle)
    /// before the header is written. The credential lock is held for the
    /// whole step, so concurrent calls sharing a credential refresh once.
    ///
    /// # Errors
    /// `EsiError::TokenExpired` when the credential is expired and has no
    /// refresh token (no network call is made); refresh failures propagate.
    pub async fn apply(&self, request: PreparedRequest) -> Result<PreparedRequest> {
        let mut request = request.with_param(DATASOURCE_PARAM, self.datasource.clone());

        let Some(binding) = &self.binding else {
            request.authorization = None;
            return Ok(request);
        };

        let mut credential = binding.credential.lock().await;
        let elapsed = credential.elapsed(self.clock.now());
        if elapsed < self.valid_duration {
            debug!(character_id = credential.character_id, "Using stored access token");
        } else {
            if !credential.can_refresh() {
                return Err(EsiError::TokenExpired { character_id: credential.character_id });
            }
            info!(
                character_id = credential.character_id,
                elapsed_secs = elapsed.as_secs(),
                "Access token expired, refreshing"
            );
            binding.lifecycle.refresh(&mut credential).await?;
        }

        request.authorization = Some(format!("Bearer {}", credential.access_token));
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use esi_core::testing::MockClock;
    use esi_domain::{Credential, RefreshFailure};

    use super::*;
    use crate::auth::share;

    /// Counts refreshes; hands out `fresh-<n>` tokens.
    struct CountingLifecycle {
        clock: MockClock,
        refreshes: AtomicUsize,
        fail: bool,
    }

    impl CountingLifecycle {
        fn new(clock: MockClock) -> Self {
            Self { clock, refreshes: AtomicUsize::new(0), fail: false }
        }
    }

    #[async_trait]
    impl CredentialLifecycle for CountingLifecycle {
        async fn refresh(&self, credential: &mut esi_domain::Credential) -> Result<()> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(EsiError::TokenRefresh {
                    kind: RefreshFailure::InvalidGrant,
                    message: "revoked".into(),
                });
            }
            credential.access_token = format!("fresh-{n}");
            credential.created = self.clock.now();
            Ok(())
        }

        async fn discard(&self, _credential: &esi_domain::Credential) -> Result<()> {
            Ok(())
        }

        fn valid_duration(&self) -> Duration {
            Duration::from_secs(1200)
        }
    }

    fn request() -> PreparedRequest {
        PreparedRequest::new("GET", "https://esi.evetech.net/latest/characters/1000/wallet/")
    }

    fn authenticator(clock: &MockClock) -> TokenAuthenticator {
        TokenAuthenticator::new(&EsiSettings::default()).with_clock(Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn unauthenticated_request_gets_default_datasource_and_no_header() {
        let clock = MockClock::new();
        let mut stale = request();
        stale.authorization = Some("Bearer leftover".into());

        let applied = authenticator(&clock).apply(stale).await.unwrap();
        assert_eq!(applied.param("datasource"), Some("tranquility"));
        assert!(applied.authorization.is_none());
    }

    #[tokio::test]
    async fn custom_datasource_is_applied() {
        let clock = MockClock::new();
        let applied =
            authenticator(&clock).with_datasource("singularity").apply(request()).await.unwrap();
        assert_eq!(applied.param("datasource"), Some("singularity"));
    }

    #[tokio::test]
    async fn fresh_token_is_used_without_refresh() {
        let clock = MockClock::new();
        let lifecycle = Arc::new(CountingLifecycle::new(clock.clone()));
        let credential = share(Credential::new(1000, "Pilot", "stored", Some("r".into()), clock.now()));
        clock.advance(Duration::from_secs(60));

        let applied = authenticator(&clock)
            .with_credential(credential, lifecycle.clone())
            .apply(request())
            .await
            .unwrap();

        assert_eq!(applied.authorization.as_deref(), Some("Bearer stored"));
        assert_eq!(lifecycle.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_and_new_token_used() {
        let clock = MockClock::new();
        let lifecycle = Arc::new(CountingLifecycle::new(clock.clone()));
        let credential = share(Credential::new(1000, "Pilot", "stored", Some("r".into()), clock.now()));
        clock.advance(Duration::from_secs(1200));

        let auth = authenticator(&clock).with_credential(credential.clone(), lifecycle.clone());
        let applied = auth.apply(request()).await.unwrap();

        assert_eq!(applied.authorization.as_deref(), Some("Bearer fresh-1"));
        assert_eq!(lifecycle.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(credential.lock().await.access_token, "fresh-1");

        // The refreshed token is valid again for the next call.
        let again = auth.apply(request()).await.unwrap();
        assert_eq!(again.authorization.as_deref(), Some("Bearer fresh-1"));
        assert_eq!(lifecycle.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_fails_before_refresh() {
        let clock = MockClock::new();
        let lifecycle = Arc::new(CountingLifecycle::new(clock.clone()));
        let credential = share(Credential::new(1000, "Pilot", "stored", None, clock.now()));
        clock.advance(Duration::from_secs(3600));

        let err = authenticator(&clock)
            .with_credential(credential, lifecycle.clone())
            .apply(request())
            .await
            .unwrap_err();

        assert_eq!(err, EsiError::TokenExpired { character_id: 1000 });
        assert_eq!(lifecycle.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_failure_propagates() {
        let clock = MockClock::new();
        let lifecycle =
            Arc::new(CountingLifecycle { fail: true, ..CountingLifecycle::new(clock.clone()) });
        let credential = share(Credential::new(1000, "Pilot", "stored", Some("r".into()), clock.now()));
        clock.advance(Duration::from_secs(1300));

        let err = authenticator(&clock)
            .with_credential(credential, lifecycle)
            .apply(request())
            .await
            .unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn concurrent_applies_share_one_refresh() {
        let clock = MockClock::new();
        let lifecycle = Arc::new(CountingLifecycle::new(clock.clone()));
        let credential = share(Credential::new(1000, "Pilot", "stored", Some("r".into()), clock.now()));
        clock.advance(Duration::from_secs(2000));

        let auth = authenticator(&clock).with_credential(credential, lifecycle.clone());
        let (a, b) = tokio::join!(auth.apply(request()), auth.apply(request()));

        assert_eq!(a.unwrap().authorization, b.unwrap().authorization);
        assert_eq!(lifecycle.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn principal_is_character_id() {
        let clock = MockClock::new();
        let lifecycle = Arc::new(CountingLifecycle::new(clock.clone()));
        let auth = authenticator(&clock);
        assert_eq!(auth.principal().await, None);

        let credential = share(Credential::new(1000, "Pilot", "stored", None, clock.now()));
        let auth = auth.with_credential(credential, lifecycle);
        assert_eq!(auth.principal().await.as_deref(), Some("1000"));
    }
}
