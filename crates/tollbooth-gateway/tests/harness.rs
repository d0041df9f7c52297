//! Shared fixtures for gateway integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tollbooth_core::error::{GateError, Result};
use tollbooth_core::ConsumptionResult;
use tollbooth_gateway::app_state::AppState;
use tollbooth_gateway::config::{self, GatewayConfig};
use tollbooth_gateway::context::RequestContext;
use tollbooth_gateway::ingest::{EventKind, EventSink};
use tollbooth_gateway::router;
use tollbooth_gateway::store::{MemoryQuotaStore, QuotaStore};

/// Config with the given `rate_limit` body (indented by two spaces).
pub fn config(rate_limit: &str) -> GatewayConfig {
    let yaml = format!("version: 1\nrate_limit:\n{rate_limit}");
    config::load_from_str(&yaml).expect("test config must load")
}

pub const STANDARD_LIMITS: &str = r#"
  general: { quota: 4, window_ms: 60000 }
  workspace: { quota: 6, window_ms: 60000 }
  custom:
    experiment_items:
      quota: 2
      window_ms: 60000
      key: "experiment_items:{workspace_id}:{experiment_id}"
      header: "Experiment-Items"
      error_message: "Too many experiment items"
"#;

#[derive(Default)]
pub struct RecordingSink {
    pub calls: AtomicUsize,
    pub items: AtomicUsize,
}

impl RecordingSink {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
    pub fn items(&self) -> usize {
        self.items.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn ingest(&self, _ctx: &RequestContext, _kind: EventKind, items: Vec<Value>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.items.fetch_add(items.len(), Ordering::SeqCst);
        Ok(())
    }
}

/// Store that never answers successfully.
pub struct DownStore {
    pub calls: AtomicU32,
}

impl DownStore {
    pub fn new() -> Self {
        Self { calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl QuotaStore for DownStore {
    fn backend(&self) -> &'static str {
        "down"
    }
    async fn try_consume(&self, _: &str, _: u64, _: u64, _: Duration) -> Result<ConsumptionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GateError::StoreUnavailable("connection refused".into()))
    }
}

/// Fails the first `failures` calls, then delegates to an in-memory store.
pub struct FlakyStore {
    inner: MemoryQuotaStore,
    failures_left: AtomicU32,
    pub calls: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryQuotaStore::new(),
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl QuotaStore for FlakyStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }
    async fn try_consume(&self, key: &str, cost: u64, quota: u64, window: Duration) -> Result<ConsumptionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(GateError::StoreUnavailable("connection reset".into()));
        }
        self.inner.try_consume(key, cost, quota, window).await
    }
}

/// Answers after a fixed delay.
pub struct SlowStore(pub Duration);

#[async_trait]
impl QuotaStore for SlowStore {
    fn backend(&self) -> &'static str {
        "slow"
    }
    async fn try_consume(&self, _: &str, _: u64, quota: u64, window: Duration) -> Result<ConsumptionResult> {
        tokio::time::sleep(self.0).await;
        Ok(ConsumptionResult::allowed(quota, window))
    }
}

/// Reports more remaining than the quota allows.
pub struct LyingStore;

#[async_trait]
impl QuotaStore for LyingStore {
    fn backend(&self) -> &'static str {
        "lying"
    }
    async fn try_consume(&self, _: &str, _: u64, quota: u64, window: Duration) -> Result<ConsumptionResult> {
        Ok(ConsumptionResult::allowed(quota + 1, window))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
}

pub fn app_with_store(cfg: GatewayConfig, store: Arc<dyn QuotaStore>) -> TestApp {
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::new(cfg, store, sink.clone()).expect("state must build");
    let router = router::build_router(state.clone()).expect("router must build");
    TestApp { router, state, sink }
}

pub fn app(cfg: GatewayConfig) -> TestApp {
    app_with_store(cfg, Arc::new(MemoryQuotaStore::new()))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }
    pub fn header_u64(&self, name: &str) -> u64 {
        self.header(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .parse()
            .unwrap()
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> Reply {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Reply { status, headers, body }
}

/// JSON batch request with `n` dummy items under `field`.
pub fn batch(method: Method, path: &str, field: &str, n: usize, user: &str, workspace: &str) -> Request<Body> {
    let items: Vec<Value> = (0..n).map(|i| json!({ "id": format!("item-{i}") })).collect();
    let body = json!({ field: items });
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .header("x-caller-id", user)
        .header("x-workspace-id", workspace)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn traces(n: usize, user: &str, workspace: &str) -> Request<Body> {
    batch(Method::POST, "/v1/private/traces/batch", "traces", n, user, workspace)
}

pub fn experiment_items(experiment: &str, n: usize, user: &str, workspace: &str) -> Request<Body> {
    let path = format!("/v1/private/experiments/{experiment}/items");
    batch(Method::POST, &path, "items", n, user, workspace)
}
