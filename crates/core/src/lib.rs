//! # ESI Core
//!
//! Pure client logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for caching, HTTP, credentials and time
//! - Swagger document minimization and reference validation
//! - Cache key derivation, expiry parsing and retry classification
//! - The credential sweep service
//!
//! ## Architecture Principles
//! - Only depends on `esi-domain`
//! - No HTTP, cache or runtime code
//! - All external dependencies via traits
//! - Pure, testable logic

pub mod credential;
pub mod request;
pub mod spec;
pub mod time;

// Infrastructure ports
pub mod cache_ports;
pub mod transport_ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache_ports::CacheBackend;
pub use credential::ports::{CredentialLifecycle, CredentialStore, RefreshOutcome};
pub use credential::sweep::{sweep_credentials, SweepReport};
pub use request::cache_key::{response_cache_key, spec_cache_name};
pub use request::expiry::{expiry_from_headers, time_to_expiry};
pub use request::retry::{classify, CallOutcome, RetryPolicy};
pub use spec::{minimize_spec, validate_spec};
pub use time::{Clock, Sleeper, SystemClock};
pub use transport_ports::HttpTransport;
