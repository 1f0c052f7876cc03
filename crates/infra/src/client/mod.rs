//! ESI client
//!
//! - [`EsiClientFactory`] resolves the Swagger document and builds clients
//! - [`EsiClient`] prepares operation calls
//! - [`CachingRetryingFuture`] sends them with caching, retries and paging
//! - [`EsiClientProvider`] builds one client lazily and shares it

pub mod factory;
pub mod future;
pub mod handle;
pub mod provider;

pub use factory::{ClientOptions, EsiClientFactory};
pub use future::{CachingRetryingFuture, PagedResults};
pub use handle::{EsiClient, Params};
pub use provider::EsiClientProvider;
