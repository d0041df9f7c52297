//! Fixed-window semantics of the Redis Lua script.
//!
//! Needs a live server: set `TOLLBOOTH_TEST_REDIS_URL` (e.g.
//! `redis://127.0.0.1:6379/`). Without it every test returns early.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tollbooth_gateway::store::{QuotaStore, RedisQuotaStore};

const REDIS_URL_ENV: &str = "TOLLBOOTH_TEST_REDIS_URL";
const MINUTE: Duration = Duration::from_secs(60);

async fn store() -> Option<RedisQuotaStore> {
    let Ok(url) = std::env::var(REDIS_URL_ENV) else {
        eprintln!("{REDIS_URL_ENV} not set, skipping");
        return None;
    };
    Some(RedisQuotaStore::connect(&url).await.expect("redis must be reachable"))
}

/// Key unique to this run so reruns never see old counters.
fn key(name: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("tollbooth-test:{}:{nanos}:{name}", std::process::id())
}

#[tokio::test]
async fn eight_calls_against_quota_four_then_window_reset() {
    let Some(store) = store().await else { return };
    let k = key("eight");
    let window = Duration::from_millis(300);

    let mut outcomes = Vec::new();
    for _ in 0..8 {
        outcomes.push(store.try_consume(&k, 1, 4, window).await.unwrap().allowed);
    }
    assert_eq!(outcomes, [true, true, true, true, false, false, false, false]);

    tokio::time::sleep(Duration::from_millis(400)).await;

    for i in 0..4 {
        let r = store.try_consume(&k, 1, 4, window).await.unwrap();
        assert!(r.allowed, "call {i} after reset must pass");
        assert_eq!(r.remaining, 3 - i);
    }
}

#[tokio::test]
async fn oversized_batch_is_all_or_nothing() {
    let Some(store) = store().await else { return };
    let k = key("batch");

    let r = store.try_consume(&k, 3, 4, MINUTE).await.unwrap();
    assert!(r.allowed);
    assert_eq!(r.remaining, 1);

    let r = store.try_consume(&k, 4, 4, MINUTE).await.unwrap();
    assert!(!r.allowed);
    assert_eq!(r.remaining, 1, "rejection must not debit");
    assert!(r.window_ttl > Duration::ZERO && r.window_ttl <= MINUTE);

    let r = store.try_consume(&k, 1, 4, MINUTE).await.unwrap();
    assert!(r.allowed);
    assert_eq!(r.remaining, 0);
}

#[tokio::test]
async fn new_window_gets_an_expiry() {
    let Some(store) = store().await else { return };
    let k = key("expiry");

    let r = store.try_consume(&k, 1, 10, MINUTE).await.unwrap();
    assert_eq!(r.window_ttl, MINUTE);

    let r = store.try_consume(&k, 1, 10, MINUTE).await.unwrap();
    assert!(r.window_ttl > Duration::ZERO && r.window_ttl <= MINUTE, "{:?}", r.window_ttl);
    assert_eq!(r.remaining, 8);
}

#[tokio::test]
async fn rejected_first_call_does_not_open_a_window() {
    let Some(store) = store().await else { return };
    let k = key("first");

    let r = store.try_consume(&k, 3, 2, MINUTE).await.unwrap();
    assert!(!r.allowed);
    assert_eq!(r.remaining, 2);
    assert_eq!(r.window_ttl, Duration::ZERO);

    let r = store.try_consume(&k, 2, 2, MINUTE).await.unwrap();
    assert!(r.allowed);
    assert_eq!(r.remaining, 0);
}

#[tokio::test]
async fn zero_cost_reads_without_writing() {
    let Some(store) = store().await else { return };
    let k = key("peek");

    let r = store.try_consume(&k, 0, 5, MINUTE).await.unwrap();
    assert!(r.allowed);
    assert_eq!(r.remaining, 5);
    assert_eq!(r.window_ttl, Duration::ZERO);

    store.try_consume(&k, 2, 5, MINUTE).await.unwrap();
    let r = store.try_consume(&k, 0, 5, MINUTE).await.unwrap();
    assert!(r.allowed);
    assert_eq!(r.remaining, 3);
}

#[tokio::test]
async fn zero_quota_rejects() {
    let Some(store) = store().await else { return };
    let r = store.try_consume(&key("zero"), 1, 0, MINUTE).await.unwrap();
    assert!(!r.allowed);
    assert_eq!(r.remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_never_overshoot() {
    let Some(store) = store().await else { return };
    let store = Arc::new(store);
    let k = key("race");

    let tasks = (0..40).map(|_| {
        let store = Arc::clone(&store);
        let k = k.clone();
        tokio::spawn(async move { store.try_consume(&k, 3, 31, MINUTE).await })
    });
    let admitted = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().as_ref().unwrap().allowed)
        .count();
    assert_eq!(admitted, 10);

    let r = store.try_consume(&k, 0, 31, MINUTE).await.unwrap();
    assert_eq!(r.remaining, 1);
}
