//! Lazily built, shared client

use std::sync::Arc;

use esi_domain::Result;
use tokio::sync::OnceCell;
use tracing::debug;

use super::factory::{ClientOptions, EsiClientFactory};
use super::handle::EsiClient;

/// Builds its client on first use and hands out the same one afterwards.
///
/// Concurrent first callers wait on a single build; a failed build is not
/// cached and the next call tries again.
pub struct EsiClientProvider {
    factory: Arc<EsiClientFactory>,
    options: ClientOptions,
    client: OnceCell<EsiClient>,
}

impl EsiClientProvider {
    pub fn new(factory: Arc<EsiClientFactory>, options: ClientOptions) -> Self {
        Self { factory, options, client: OnceCell::new() }
    }

    /// The shared client, building it on first call.
    ///
    /// # Errors
    /// Whatever [`EsiClientFactory::build`] returns.
    pub async fn client(&self) -> Result<&EsiClient> {
        self.client
            .get_or_try_init(|| async {
                debug!(options = ?self.options, "Building ESI client");
                self.factory.build(self.options.clone()).await
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }
}

impl std::fmt::Debug for EsiClientProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiClientProvider")
            .field("options", &self.options)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
