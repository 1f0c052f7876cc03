//! Port interfaces for credential persistence and refresh
//!
//! These traits define the boundary between the client and whatever stores
//! and refreshes SSO credentials.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use esi_domain::{Credential, EsiError, Result};
use tracing::info;
use uuid::Uuid;

/// Trait for credential persistence and retrieval
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or replace a credential
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Get credential by ID
    async fn get(&self, id: Uuid) -> Result<Option<Credential>>;

    /// Delete a credential by ID
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Every stored credential
    async fn list(&self) -> Result<Vec<Credential>>;
}

/// Result of [`CredentialLifecycle::refresh_or_delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Deleted,
}

/// Refreshes credentials against SSO
#[async_trait]
pub trait CredentialLifecycle: Send + Sync {
    /// Exchange the refresh token, update `credential` in place and persist
    /// it before returning.
    ///
    /// Fails with `EsiError::TokenExpired` when the credential has no refresh
    /// token and `EsiError::TokenRefresh` when the exchange fails.
    async fn refresh(&self, credential: &mut Credential) -> Result<()>;

    /// Remove a credential that can no longer be used
    async fn discard(&self, credential: &Credential) -> Result<()>;

    /// How long an access token is trusted after issue
    fn valid_duration(&self) -> Duration;

    fn is_expired(&self, credential: &Credential, now: DateTime<Utc>) -> bool {
        credential.is_expired(now, self.valid_duration())
    }

    /// Refresh, deleting the credential when it is beyond repair.
    ///
    /// Transient failures (transport, rejected client) propagate and leave
    /// the credential stored.
    async fn refresh_or_delete(&self, credential: &mut Credential) -> Result<RefreshOutcome> {
        match self.refresh(credential).await {
            Ok(()) => Ok(RefreshOutcome::Refreshed),
            Err(EsiError::TokenExpired { .. }) => {
                self.discard(credential).await?;
                info!(character_id = credential.character_id, "Deleted non-refreshable credential");
                Ok(RefreshOutcome::Deleted)
            }
            Err(EsiError::TokenRefresh { kind, .. }) if kind.should_discard_credential() => {
                self.discard(credential).await?;
                info!(
                    character_id = credential.character_id,
                    reason = %kind,
                    "Deleted credential rejected by SSO"
                );
                Ok(RefreshOutcome::Deleted)
            }
            Err(err) => Err(err),
        }
    }
}
