//! SSO credential types
//!
//! A credential is an access/refresh token pair issued by EVE SSO for one
//! character, optionally owned by an application user.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::CURRENT_SSO_VERSION;

/// Persisted SSO credential for one character
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub character_id: i64,
    pub character_name: String,
    pub character_owner_hash: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub sso_version: u8,
    /// When the current access token was issued.
    pub created: DateTime<Utc>,
    pub scopes: BTreeSet<String>,
    /// Owning application user; `None` marks an orphaned credential.
    pub user: Option<String>,
}

impl Credential {
    pub fn new(
        character_id: i64,
        character_name: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            character_id,
            character_name: character_name.into(),
            character_owner_hash: String::new(),
            access_token: access_token.into(),
            refresh_token,
            token_type: "character".to_string(),
            sso_version: CURRENT_SSO_VERSION,
            created,
            scopes: BTreeSet::new(),
            user: None,
        }
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Time since the access token was issued, clamped at zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created).to_std().unwrap_or(Duration::ZERO)
    }

    /// The access token is no longer inside its validity window.
    pub fn is_expired(&self, now: DateTime<Utc>, valid_for: Duration) -> bool {
        self.elapsed(now) >= valid_for
    }

    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub const fn is_orphaned(&self) -> bool {
        self.user.is_none()
    }

    /// Every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required.iter().all(|scope| self.scopes.contains(*scope))
    }

    /// Space separated scope list as sent to SSO.
    pub fn scope_string(&self) -> String {
        self.scopes.iter().cloned().collect::<Vec<_>>().join(" ")
    }
}

// Tokens never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("character_id", &self.character_id)
            .field("character_name", &self.character_name)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("sso_version", &self.sso_version)
            .field("created", &self.created)
            .field("scopes", &self.scopes)
            .field("user", &self.user)
            .finish()
    }
}
