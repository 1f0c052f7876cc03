//! Response classification and backoff policy
//!
//! Only the gateway statuses 502/503/504 are retried. Backoff before retry
//! `i` (zero based) is `backoff_factor * 2^i` seconds.

use std::time::Duration;

use esi_domain::constants::RETRYABLE_STATUSES;
use esi_domain::{EsiError, EsiSettings, RawResponse};

/// What the retry loop should do with a response
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(RawResponse),
    Retryable(RawResponse),
    Fatal(EsiError),
}

/// Sort a response into success, retryable or fatal.
pub fn classify(response: RawResponse) -> CallOutcome {
    if response.is_success() {
        CallOutcome::Success(response)
    } else if RETRYABLE_STATUSES.contains(&response.status) {
        CallOutcome::Retryable(response)
    } else {
        CallOutcome::Fatal(status_error(response))
    }
}

/// Error for a response that ended the call.
pub fn status_error(response: RawResponse) -> EsiError {
    EsiError::HttpStatus { status: response.status, body: response.body }
}

/// Retry budget and backoff for one call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self { max_retries, backoff_factor }
    }

    pub const fn from_settings(settings: &EsiSettings) -> Self {
        Self::new(settings.server_error_max_retries, settings.server_error_backoff_factor)
    }

    /// Apply a per-call override, which can only lower the budget.
    #[must_use]
    pub fn with_override(self, retries: Option<u32>) -> Self {
        match retries {
            Some(retries) => Self { max_retries: self.max_retries.min(retries), ..self },
            None => self,
        }
    }

    pub const fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry_index` (zero based).
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else if secs.is_infinite() && secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        }
    }

    /// Every delay a fully failing call sleeps through.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|i| self.delay_for(i)).collect()
    }
}
