//! SSO credential handling
//!
//! - [`TokenAuthenticator`] decorates outgoing requests with a datasource and
//!   a bearer token, refreshing expired tokens first
//! - [`SsoLifecycle`] performs the refresh-token grant against EVE SSO
//! - [`InMemoryCredentialStore`] keeps credentials for tests and
//!   single-process apps

pub mod authenticator;
pub mod sso;
pub mod store;

use std::sync::Arc;

use esi_domain::Credential;
use tokio::sync::Mutex;

pub use authenticator::TokenAuthenticator;
pub use sso::SsoLifecycle;
pub use store::InMemoryCredentialStore;

/// Credential shared between clients; the lock serializes refreshes.
pub type SharedCredential = Arc<Mutex<Credential>>;

/// Wrap a credential for sharing.
pub fn share(credential: Credential) -> SharedCredential {
    Arc::new(Mutex::new(credential))
}
