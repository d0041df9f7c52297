//! In-process fixed-window counters.
//!
//! Atomicity comes from DashMap's per-shard write lock: the whole
//! check-and-increment for a key runs while holding its entry. That is exact
//! for one process only; multi-instance deployments use the Redis store.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use tollbooth_core::error::{GateError, Result};
use tollbooth_core::ConsumptionResult;

use super::QuotaStore;

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

impl Counter {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    counters: DashMap<String, Counter>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self { counters: DashMap::new() }
    }

    /// Number of counters held, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every counter whose window has ended.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, c| c.live(now));
        before.saturating_sub(self.counters.len())
    }

    /// Background eviction of expired counters. Stops once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(store) = weak.upgrade() else { break };
                let evicted = store.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = store.len(), "memory quota store swept");
                }
            }
        })
    }

    fn peek(&self, key: &str, quota: u64, now: Instant) -> ConsumptionResult {
        match self.counters.get(key) {
            Some(c) if c.live(now) => ConsumptionResult::allowed(
                quota.saturating_sub(c.count),
                c.expires_at.saturating_duration_since(now),
            ),
            _ => ConsumptionResult::allowed(quota, Duration::ZERO),
        }
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn try_consume(
        &self,
        key: &str,
        cost: u64,
        quota: u64,
        window: Duration,
    ) -> Result<ConsumptionResult> {
        if window.is_zero() {
            return Err(GateError::Config(format!("zero window for key {key}")));
        }
        let now = Instant::now();
        if cost == 0 {
            return Ok(self.peek(key, quota, now));
        }
        let window_end = now
            .checked_add(window)
            .ok_or_else(|| GateError::Config(format!("window too large for key {key}")))?;

        // The entry guard holds the shard lock until the end of this match.
        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut o) if o.get().live(now) => {
                let c = o.get_mut();
                let ttl = c.expires_at.saturating_duration_since(now);
                match c.count.checked_add(cost) {
                    Some(total) if total <= quota => {
                        c.count = total;
                        Ok(ConsumptionResult::allowed(quota - total, ttl))
                    }
                    _ => Ok(ConsumptionResult::rejected(quota.saturating_sub(c.count), ttl)),
                }
            }
            Entry::Occupied(mut o) => {
                // Window over: behave exactly like an absent key.
                if cost > quota {
                    o.remove();
                    return Ok(ConsumptionResult::rejected(quota, Duration::ZERO));
                }
                o.insert(Counter { count: cost, expires_at: window_end });
                Ok(ConsumptionResult::allowed(quota - cost, window))
            }
            Entry::Vacant(v) => {
                if cost > quota {
                    return Ok(ConsumptionResult::rejected(quota, Duration::ZERO));
                }
                v.insert(Counter { count: cost, expires_at: window_end });
                Ok(ConsumptionResult::allowed(quota - cost, window))
            }
        }
    }
}
