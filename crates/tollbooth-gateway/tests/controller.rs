//! Admission controller decisions against misbehaving stores.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod harness;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tollbooth_core::EventCost;
use tollbooth_gateway::admission::{AdmissionController, RetryPolicy, Verdict};
use tollbooth_gateway::config::GatewayConfig;
use tollbooth_gateway::context::RequestContext;
use tollbooth_gateway::ingest;
use tollbooth_gateway::obs::GatewayMetrics;
use tollbooth_gateway::registry::{BoundOperation, LimitRegistry};
use tollbooth_gateway::store::{MemoryQuotaStore, QuotaStore};

use harness::{config, FlakyStore, LyingStore, SlowStore};

fn setup(cfg: &GatewayConfig, store: Arc<dyn QuotaStore>) -> (AdmissionController, BoundOperation, Arc<GatewayMetrics>) {
    let registry = LimitRegistry::from_config(&cfg.rate_limit).unwrap();
    let op = registry.bind(&ingest::TRACES_BATCH).unwrap();
    let metrics = Arc::new(GatewayMetrics::default());
    let controller = AdmissionController::new(&cfg.rate_limit, store, Arc::clone(&metrics));
    (controller, op, metrics)
}

fn ctx() -> RequestContext {
    RequestContext::new("alice", "acme")
}

const TWO_SCOPES: &str = r#"
  general: { quota: 5, window_ms: 60000 }
  workspace: { quota: 5, window_ms: 60000 }
"#;

#[test]
fn retry_policy_follows_store_section() {
    let cfg = config(
        r#"
  store: { timeout_ms: 250, retry_attempts: 3, retry_backoff_ms: 20 }
"#,
    );
    let p = RetryPolicy::from_config(&cfg.rate_limit);
    assert_eq!(p.attempts, 3);
    assert_eq!(p.backoff, Duration::from_millis(20));
    assert_eq!(p.timeout, Duration::from_millis(250));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let store = Arc::new(FlakyStore::new(1));
    let (controller, op, metrics) = setup(&config(TWO_SCOPES), store.clone());

    let verdict = controller.evaluate(&op, &ctx(), EventCost::ONE).await.unwrap();
    let Verdict::Admit { evaluated } = verdict else {
        panic!("expected admit, got {verdict:?}");
    };
    assert_eq!(evaluated.len(), 2);
    assert_eq!(evaluated[0].key, "tollbooth:general:alice");
    assert_eq!(evaluated[1].key, "tollbooth:workspace:acme");
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert_eq!(metrics.store_fallbacks.get(&[("op", "traces.batch"), ("policy", "open")]), 0);
}

#[tokio::test]
async fn exhausted_retries_skip_the_scope_when_open() {
    let cfg = config(
        r#"
  general: { quota: 5, window_ms: 60000 }
  workspace: { quota: 5, window_ms: 60000 }
  store: { retry_attempts: 1 }
"#,
    );
    let store = Arc::new(FlakyStore::new(1));
    let (controller, op, metrics) = setup(&cfg, store.clone());

    let verdict = controller.evaluate(&op, &ctx(), EventCost::ONE).await.unwrap();
    let Verdict::Admit { evaluated } = verdict else {
        panic!("expected admit, got {verdict:?}");
    };
    // General was skipped, workspace answered.
    assert_eq!(evaluated.len(), 1);
    assert_eq!(evaluated[0].limit.scope_id, "workspace");
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.store_fallbacks.get(&[("op", "traces.batch"), ("policy", "open")]), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_and_fails_closed() {
    let cfg = config(
        r#"
  failure_policy: closed
  general: { quota: 5, window_ms: 60000 }
  store: { timeout_ms: 100 }
"#,
    );
    let (controller, op, metrics) = setup(&cfg, Arc::new(SlowStore(Duration::from_secs(5))));

    let verdict = controller.evaluate(&op, &ctx(), EventCost::ONE).await.unwrap();
    match verdict {
        Verdict::Unavailable { scope, reason } => {
            assert_eq!(scope.scope_id, "general");
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
    assert_eq!(metrics.store_failures.get(&[("backend", "slow"), ("code", "UNAVAILABLE")]), 1);
    assert_eq!(metrics.store_latency.count(&[("backend", "slow")]), 1);
}

#[tokio::test]
async fn inconsistent_reply_counts_as_store_failure() {
    let closed = config(
        r#"
  failure_policy: closed
  general: { quota: 5, window_ms: 60000 }
"#,
    );
    let (controller, op, _) = setup(&closed, Arc::new(LyingStore));
    let verdict = controller.evaluate(&op, &ctx(), EventCost::ONE).await.unwrap();
    assert!(matches!(verdict, Verdict::Unavailable { .. }), "{verdict:?}");

    let (controller, op, metrics) = setup(&config(TWO_SCOPES), Arc::new(LyingStore));
    let verdict = controller.evaluate(&op, &ctx(), EventCost::ONE).await.unwrap();
    let Verdict::Admit { evaluated } = verdict else {
        panic!("expected admit, got {verdict:?}");
    };
    assert!(evaluated.is_empty());
    assert_eq!(metrics.store_failures.get(&[("backend", "lying"), ("code", "UNAVAILABLE")]), 2);
}

#[tokio::test]
async fn rejection_reports_scopes_that_passed() {
    let cfg = config(
        r#"
  general: { quota: 10, window_ms: 60000 }
  workspace: { quota: 2, window_ms: 60000 }
"#,
    );
    let (controller, op, metrics) = setup(&cfg, Arc::new(MemoryQuotaStore::new()));

    let verdict = controller.evaluate(&op, &ctx(), EventCost::new(3)).await.unwrap();
    let Verdict::Reject { evaluated, failed } = verdict else {
        panic!("expected reject, got {verdict:?}");
    };
    assert_eq!(evaluated.len(), 1);
    assert_eq!(evaluated[0].result.remaining, 7);
    assert_eq!(failed.limit.scope_id, "workspace");
    assert!(!failed.result.allowed);
    assert_eq!(failed.result.remaining, 2);
    assert_eq!(
        metrics
            .requests_rejected
            .get(&[("op", "traces.batch"), ("scope", "workspace")]),
        1
    );
    assert_eq!(metrics.requests_admitted.get(&[("op", "traces.batch")]), 0);
}

#[tokio::test]
async fn admitted_events_are_counted_by_cost() {
    let (controller, op, metrics) = setup(&config(TWO_SCOPES), Arc::new(MemoryQuotaStore::new()));
    let verdict = controller.evaluate(&op, &ctx(), EventCost::new(4)).await.unwrap();
    assert!(verdict.is_admit());
    assert_eq!(metrics.events_admitted.get(&[("op", "traces.batch")]), 4);
}
