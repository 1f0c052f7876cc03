//! In-process cache with moka
//!
//! Every entry carries its own time-to-live, taken from the spec cache
//! duration or from the response's `Expires` header.
//!
//! # Example
//!
//! ```rust,ignore
//! use esi_infra::cache::{MokaCacheBackend, MokaCacheConfig};
//!
//! let cache = MokaCacheBackend::new(MokaCacheConfig::default());
//! cache.set("esi_swaggerspec_latest", body, Duration::from_secs(3600)).await?;
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use esi_core::CacheBackend;
use esi_domain::constants::DEFAULT_CACHE_MAX_CAPACITY;
use esi_domain::{EsiSettings, Result};
use moka::sync::Cache;
use moka::Expiry;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct MokaCacheConfig {
    /// Maximum number of entries kept
    pub max_capacity: u64,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self { max_capacity: DEFAULT_CACHE_MAX_CAPACITY }
    }
}

impl MokaCacheConfig {
    pub const fn from_settings(settings: &EsiSettings) -> Self {
        Self { max_capacity: settings.cache_max_capacity }
    }

    /// Log configuration at startup
    pub fn log_config(&self) {
        tracing::info!(max_capacity = self.max_capacity, "ESI cache configuration loaded");
    }
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// moka-backed [`CacheBackend`]
#[derive(Clone)]
pub struct MokaCacheBackend {
    cache: Cache<String, Entry>,
}

impl MokaCacheBackend {
    pub fn new(config: MokaCacheConfig) -> Self {
        config.log_config();
        let cache =
            Cache::builder().max_capacity(config.max_capacity).expire_after(EntryTtl).build();
        Self { cache }
    }

    /// Number of live entries (approximate until pending tasks run)
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for MokaCacheBackend {
    fn default() -> Self {
        Self::new(MokaCacheConfig::default())
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let hit = self.cache.get(key).map(|entry| entry.value);
        tracing::debug!(key, hit = hit.is_some(), "cache lookup");
        Ok(hit)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.cache.invalidate(key);
            return Ok(());
        }
        self.cache.insert(key.to_string(), Entry { value, ttl });
        Ok(())
    }
}

/// Backend that stores nothing; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

#[async_trait]
impl CacheBackend for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}
