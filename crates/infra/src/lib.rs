//! # ESI Infrastructure
//!
//! Infrastructure implementations of the `esi-core` ports and the client
//! built on them.
//!
//! This crate contains:
//! - reqwest HTTP transport
//! - moka response and document cache
//! - Swagger document resolution and parsing
//! - SSO token refresh and request authentication
//! - The client, its caching retrying future and the lazy provider
//! - Settings loading from files and environment
//!
//! ## Architecture
//! - Implements traits defined in `esi-core`
//! - Depends on `esi-domain` and `esi-core`
//! - Contains all "impure" code (network, timers, environment)

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod spec;
pub mod time;

// Re-export commonly used items
pub use auth::{share, InMemoryCredentialStore, SharedCredential, SsoLifecycle, TokenAuthenticator};
pub use cache::{MokaCacheBackend, MokaCacheConfig, NoCache};
pub use client::{
    CachingRetryingFuture, ClientOptions, EsiClient, EsiClientFactory, EsiClientProvider,
    PagedResults, Params,
};
pub use errors::InfraError;
pub use http::ReqwestTransport;
pub use spec::{SpecConfig, SpecDocument, SpecResolver};
pub use time::TokioSleeper;
