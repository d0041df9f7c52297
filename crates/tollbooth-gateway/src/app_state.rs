//! Shared application state for the Tollbooth gateway.
//!
//! Everything the request path reads is compiled here, once:
//! - limit definitions and their header names
//! - every protected operation bound to its ordered scope list
//! - the admission controller over the configured quota store
//!
//! Configuration mistakes surface from `AppState::new` as `GateError::Config`,
//! never at request time.

use std::collections::HashMap;
use std::sync::Arc;

use tollbooth_core::error::{GateError, Result};

use crate::admission::AdmissionController;
use crate::config::GatewayConfig;
use crate::context::{ContextResolver, HeaderContextResolver};
use crate::ingest::{self, EventSink};
use crate::obs::GatewayMetrics;
use crate::registry::{BoundOperation, LimitRegistry};
use crate::store::QuotaStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    operations: HashMap<&'static str, Arc<BoundOperation>>,
    admission: AdmissionController,
    resolver: Arc<dyn ContextResolver>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(cfg: GatewayConfig, store: Arc<dyn QuotaStore>, sink: Arc<dyn EventSink>) -> Result<Self> {
        let resolver = Arc::new(HeaderContextResolver::new(&cfg.context));
        Self::with_resolver(cfg, store, sink, resolver)
    }

    pub fn with_resolver(
        cfg: GatewayConfig,
        store: Arc<dyn QuotaStore>,
        sink: Arc<dyn EventSink>,
        resolver: Arc<dyn ContextResolver>,
    ) -> Result<Self> {
        // 1) Compile limit definitions
        let registry = LimitRegistry::from_config(&cfg.rate_limit)?;

        // 2) Bind every protected operation to its scopes
        let mut operations = HashMap::new();
        for spec in &ingest::OPERATIONS {
            let bound = registry.bind(spec)?;
            tracing::debug!(
                op = spec.name,
                scopes = bound.scopes().len(),
                "operation bound"
            );
            operations.insert(spec.name, Arc::new(bound));
        }

        // custom limits <-> operations sanity check
        for name in registry.custom_names() {
            let used = ingest::OPERATIONS.iter().any(|op| op.custom_limit == Some(name));
            if !used {
                tracing::warn!(limit = %name, "custom limit is not referenced by any operation");
            }
        }

        let metrics = Arc::new(GatewayMetrics::default());
        let admission = AdmissionController::new(&cfg.rate_limit, Arc::clone(&store), Arc::clone(&metrics));

        tracing::info!(
            enabled = cfg.rate_limit.enabled,
            backend = store.backend(),
            failure_policy = cfg.rate_limit.failure_policy.as_str(),
            "admission control ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                operations,
                admission,
                resolver,
                sink,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn operation(&self, name: &str) -> Result<Arc<BoundOperation>> {
        self.inner
            .operations
            .get(name)
            .cloned()
            .ok_or_else(|| GateError::Internal(format!("operation {name} is not bound")))
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.inner.admission
    }

    pub fn context_resolver(&self) -> &dyn ContextResolver {
        self.inner.resolver.as_ref()
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.inner.sink.as_ref()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }
}
