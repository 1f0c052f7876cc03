//! Error types used throughout the client

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::RETRYABLE_STATUSES;

/// Main error type for ESI operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum EsiError {
    #[error("Schema resolution error: {0}")]
    SpecResolution(String),

    #[error("Client construction error: {0}")]
    ClientConstruction(String),

    #[error("Token for character {character_id} expired and cannot be refreshed")]
    TokenExpired { character_id: i64 },

    #[error("Token refresh failed ({kind}): {message}")]
    TokenRefresh { kind: RefreshFailure, message: String },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl EsiError {
    /// HTTP status carried by the error, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures caused by missing, expired or rejected credentials.
    pub const fn is_auth_error(&self) -> bool {
        match self {
            Self::TokenExpired { .. } | Self::TokenRefresh { .. } => true,
            Self::HttpStatus { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// True when the server answered with one of the transient gateway
    /// statuses the caching future retries.
    pub fn is_retryable(&self) -> bool {
        self.status().is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
    }
}

impl From<serde_json::Error> for EsiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EsiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Why an SSO refresh attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailure {
    /// The refresh token was revoked or is otherwise unusable.
    InvalidGrant,
    /// Client id or secret rejected by the SSO server.
    InvalidClient,
    /// The token itself was malformed.
    InvalidToken,
    /// Network failure or an unexpected SSO response.
    Transport,
    /// The SSO server answered 200 without an access token.
    IncompleteResponse,
}

impl RefreshFailure {
    /// Map an OAuth2 `error` code to a failure kind.
    pub fn from_oauth_code(code: &str) -> Self {
        match code {
            "invalid_grant" => Self::InvalidGrant,
            "invalid_client" | "unauthorized_client" => Self::InvalidClient,
            "invalid_token" => Self::InvalidToken,
            _ => Self::Transport,
        }
    }

    /// Credentials failing this way will never refresh again and should be
    /// deleted.
    pub const fn should_discard_credential(self) -> bool {
        matches!(self, Self::InvalidGrant | Self::InvalidToken)
    }

    /// Canonical string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidClient => "invalid_client",
            Self::InvalidToken => "invalid_token",
            Self::Transport => "transport",
            Self::IncompleteResponse => "incomplete_response",
        }
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for ESI operations
pub type Result<T> = std::result::Result<T, EsiError>;
