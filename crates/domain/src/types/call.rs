//! Per-call options

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout for one HTTP exchange: a single value or a connect/read pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestTimeout {
    Single(Duration),
    Pair { connect: Duration, read: Duration },
}

impl RequestTimeout {
    pub const fn connect(&self) -> Duration {
        match self {
            Self::Single(timeout) => *timeout,
            Self::Pair { connect, .. } => *connect,
        }
    }

    pub const fn read(&self) -> Duration {
        match self {
            Self::Single(timeout) => *timeout,
            Self::Pair { read, .. } => *read,
        }
    }

    /// Upper bound for the whole exchange.
    pub fn total(&self) -> Duration {
        match self {
            Self::Single(timeout) => *timeout,
            Self::Pair { connect, read } => connect.saturating_add(*read),
        }
    }
}

impl From<Duration> for RequestTimeout {
    fn from(timeout: Duration) -> Self {
        Self::Single(timeout)
    }
}

impl From<(Duration, Duration)> for RequestTimeout {
    fn from((connect, read): (Duration, Duration)) -> Self {
        Self::Pair { connect, read }
    }
}

/// Options accepted by `result`, `results` and friends.
///
/// Every field is optional; unset fields fall back to the client settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Option<RequestTimeout>,
    pub language: Option<String>,
    /// Caps the configured retry count; it can only lower it.
    pub retries: Option<u32>,
    pub page: Option<u32>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeout(mut self, timeout: impl Into<RequestTimeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// Behaviour switches attached to an operation future.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestConfig {
    /// Return the raw HTTP response alongside the payload.
    pub also_return_response: bool,
}
