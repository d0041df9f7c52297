//! Redis-backed fixed-window counters shared by every gateway instance.
//!
//! The check-and-increment runs as one Lua script, so Redis executes it
//! without interleaving other commands on the same key.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use tollbooth_core::error::{GateError, Result};
use tollbooth_core::ConsumptionResult;

use super::QuotaStore;

/// KEYS[1] = counter key
/// ARGV[1] = cost, ARGV[2] = quota, ARGV[3] = window in ms
///
/// Returns `{allowed, remaining, ttl_ms}`.
const FIXED_WINDOW_LUA: &str = r#"
local key = KEYS[1]
local cost = tonumber(ARGV[1])
local quota = tonumber(ARGV[2])
local window_ms = tonumber(ARGV[3])

local current = tonumber(redis.call('GET', key) or '0')
local ttl = redis.call('PTTL', key)
if ttl < 0 then
  ttl = 0
end

if cost == 0 then
  local left = quota - current
  if left < 0 then left = 0 end
  return {1, left, ttl}
end

if current + cost > quota then
  local left = quota - current
  if left < 0 then left = 0 end
  return {0, left, ttl}
end

local total = redis.call('INCRBY', key, cost)
if total == cost or ttl == 0 then
  redis.call('PEXPIRE', key, window_ms)
  ttl = window_ms
end
return {1, quota - total, ttl}
"#;

pub struct RedisQuotaStore {
    conn: ConnectionManager,
    script: Script,
}

impl RedisQuotaStore {
    /// Open the client and establish the managed connection.
    /// The manager reconnects on its own after transient failures.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| GateError::Config(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| GateError::StoreUnavailable(format!("redis connect failed: {e}")))?;
        tracing::info!("redis quota store connected");
        Ok(Self {
            conn,
            script: Script::new(FIXED_WINDOW_LUA),
        })
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn try_consume(
        &self,
        key: &str,
        cost: u64,
        quota: u64,
        window: Duration,
    ) -> Result<ConsumptionResult> {
        let window_ms = u64::try_from(window.as_millis())
            .map_err(|_| GateError::Config(format!("window too large for key {key}")))?;
        if window_ms == 0 {
            return Err(GateError::Config(format!("zero window for key {key}")));
        }

        let mut conn = self.conn.clone();
        let (allowed, remaining, ttl_ms): (i64, i64, i64) = self
            .script
            .key(key)
            .arg(cost)
            .arg(quota)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| GateError::StoreUnavailable(format!("redis script failed: {e}")))?;

        ConsumptionResult::from_raw(allowed, remaining, ttl_ms)
    }
}
