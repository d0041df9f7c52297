//! Quota stores: the atomic "consume N events from bucket B in window W" primitive.
//!
//! Every backend must make the read-check-increment for one key a single
//! atomic step on the side that owns the counters. Callers may be separate
//! gateway instances sharing nothing but the backend, so client-side locking
//! does not count.

pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tollbooth_core::error::Result;
use tollbooth_core::ConsumptionResult;

use crate::config::{StoreBackend, StoreSection};

pub use memory::MemoryQuotaStore;
pub use redis_store::RedisQuotaStore;

/// Fixed-window counter store.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Backend label for logs and metrics.
    fn backend(&self) -> &'static str;

    /// Atomically add `cost` to `key` if the window total stays within `quota`.
    ///
    /// - absent or expired key: starts a new window of length `window`
    /// - `count + cost > quota`: nothing changes, `allowed = false`
    /// - `cost == 0`: read only, always allowed
    async fn try_consume(
        &self,
        key: &str,
        cost: u64,
        quota: u64,
        window: Duration,
    ) -> Result<ConsumptionResult>;
}

/// Build the configured store. Redis connects eagerly so a bad URL fails boot.
pub async fn build(cfg: &StoreSection) -> Result<Arc<dyn QuotaStore>> {
    match cfg.backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryQuotaStore::new());
            store.spawn_sweeper(Duration::from_millis(cfg.sweep_interval_ms));
            Ok(store)
        }
        StoreBackend::Redis => {
            let url = cfg.redis_url.as_deref().unwrap_or_default();
            Ok(Arc::new(RedisQuotaStore::connect(url).await?))
        }
    }
}
