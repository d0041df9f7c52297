use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tollbooth_core::error::{GateError, Result};
use tollbooth_core::{ConsumptionResult, EventCost};

use crate::config::{FailurePolicy, RateLimitSection};
use crate::context::RequestContext;
use crate::obs::GatewayMetrics;
use crate::registry::{BoundOperation, LimitDefinition};
use crate::store::QuotaStore;

/// One evaluated scope and what the store said about it.
#[derive(Debug, Clone)]
pub struct ScopeOutcome {
    pub limit: Arc<LimitDefinition>,
    pub key: String,
    pub result: ConsumptionResult,
}

/// Decision for one request.
///
/// Scopes are committed one at a time (check-then-commit per scope): quota
/// debited by scopes that passed before a rejection stays debited.
#[derive(Debug)]
pub enum Verdict {
    /// Every scope admitted the cost. `evaluated` holds scopes the store
    /// answered for; bypassed scopes are absent.
    Admit { evaluated: Vec<ScopeOutcome> },
    /// A scope rejected. `evaluated` holds the scopes that passed before it.
    Reject {
        evaluated: Vec<ScopeOutcome>,
        failed: ScopeOutcome,
    },
    /// The store failed and the policy is fail-closed.
    Unavailable { scope: Arc<LimitDefinition>, reason: String },
}

impl Verdict {
    pub fn is_admit(&self) -> bool {
        matches!(self, Verdict::Admit { .. })
    }
}

/// Fixed-attempt, fixed-backoff retry under one hard deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RateLimitSection) -> Self {
        Self {
            attempts: cfg.store.retry_attempts.max(1),
            backoff: Duration::from_millis(cfg.store.retry_backoff_ms),
            timeout: Duration::from_millis(cfg.store.timeout_ms),
        }
    }
}

/// Evaluates an operation's scopes against the quota store.
pub struct AdmissionController {
    enabled: bool,
    policy: FailurePolicy,
    retry: RetryPolicy,
    store: Arc<dyn QuotaStore>,
    metrics: Arc<GatewayMetrics>,
}

impl AdmissionController {
    pub fn new(
        cfg: &RateLimitSection,
        store: Arc<dyn QuotaStore>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            enabled: cfg.enabled,
            policy: cfg.failure_policy,
            retry: RetryPolicy::from_config(cfg),
            store,
            metrics,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate scopes in order, stopping at the first rejection.
    pub async fn evaluate(
        &self,
        op: &BoundOperation,
        ctx: &RequestContext,
        cost: EventCost,
    ) -> Result<Verdict> {
        let mut evaluated = Vec::with_capacity(op.scopes().len());

        for scope in op.scopes() {
            let key = scope.key.render(ctx)?;
            let limit = &scope.limit;

            match self.consume(&key, cost.get(), limit).await {
                Ok(result) if result.allowed => {
                    evaluated.push(ScopeOutcome { limit: Arc::clone(limit), key, result });
                }
                Ok(result) => {
                    tracing::debug!(
                        op = op.name(),
                        scope = %limit.scope_id,
                        kind = limit.kind.as_str(),
                        key = %key,
                        cost = cost.get(),
                        remaining = result.remaining,
                        "quota exceeded"
                    );
                    self.metrics
                        .requests_rejected
                        .inc(&[("op", op.name()), ("scope", limit.scope_id.as_str())]);
                    return Ok(Verdict::Reject {
                        evaluated,
                        failed: ScopeOutcome { limit: Arc::clone(limit), key, result },
                    });
                }
                Err(e) => {
                    let code = e.client_code().as_str();
                    self.metrics
                        .store_failures
                        .inc(&[("backend", self.store.backend()), ("code", code)]);
                    self.metrics
                        .store_fallbacks
                        .inc(&[("op", op.name()), ("policy", self.policy.as_str())]);
                    tracing::warn!(
                        op = op.name(),
                        scope = %limit.scope_id,
                        key = %key,
                        policy = self.policy.as_str(),
                        error = %e,
                        "quota store check failed"
                    );
                    match self.policy {
                        FailurePolicy::Open => continue,
                        FailurePolicy::Closed => {
                            return Ok(Verdict::Unavailable {
                                scope: Arc::clone(limit),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        self.metrics.requests_admitted.inc(&[("op", op.name())]);
        self.metrics.events_admitted.add(&[("op", op.name())], cost.get());
        Ok(Verdict::Admit { evaluated })
    }

    /// One scope check: bounded retries under a hard deadline, then a bounds
    /// check on the reply. Inconsistent replies count as store failures.
    async fn consume(&self, key: &str, cost: u64, limit: &LimitDefinition) -> Result<ConsumptionResult> {
        let started = Instant::now();
        let attempts = async {
            let mut attempt = 1;
            loop {
                match self.store.try_consume(key, cost, limit.quota, limit.window).await {
                    Ok(r) => return Ok(r),
                    Err(e) if e.is_retryable() && attempt < self.retry.attempts => {
                        tracing::debug!(key, attempt, error = %e, "quota store retry");
                        tokio::time::sleep(self.retry.backoff).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let res = match tokio::time::timeout(self.retry.timeout, attempts).await {
            Ok(r) => r,
            Err(_) => Err(GateError::StoreUnavailable(format!(
                "timed out after {}ms",
                self.retry.timeout.as_millis()
            ))),
        };
        self.metrics
            .store_latency
            .observe(&[("backend", self.store.backend())], started.elapsed());

        let result = res?;
        result.check_bounds(limit.quota, limit.window)?;
        Ok(result)
    }
}
