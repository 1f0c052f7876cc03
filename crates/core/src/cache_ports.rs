//! Cache backend port
//!
//! Both the spec resolver and the response cache talk to a string keyed
//! store through this trait. Implementations may fail; callers treat every
//! failure as a miss.

use std::time::Duration;

use async_trait::async_trait;
use esi_domain::Result;

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store an entry for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}
