use std::collections::HashSet;
use std::sync::Arc;

use super::key::CompiledKey;
use super::limits::LimitDefinition;

/// How many events a request costs, decided before the operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostSource {
    /// Every request costs one event.
    Unit,
    /// JSON body with an array under this field; cost is its length.
    BatchField(&'static str),
}

/// Declarative admission marker for one protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Stable operation name used in logs and metrics.
    pub name: &'static str,
    /// Route pattern in axum syntax, e.g. `/v1/private/experiments/:experiment_id/items`.
    pub path: &'static str,
    /// Named custom limit applied after the general/workspace scopes.
    pub custom_limit: Option<&'static str>,
    /// Whether the workspace-wide scope applies.
    pub workspace_scope: bool,
    pub cost: CostSource,
}

impl OperationSpec {
    /// Parameter names captured by the route pattern.
    pub fn route_params(&self) -> HashSet<String> {
        self.path
            .split('/')
            .filter_map(|seg| seg.strip_prefix(':').or_else(|| seg.strip_prefix('*')))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A limit plus the key compiled for it in the context of one operation.
#[derive(Debug, Clone)]
pub struct BoundScope {
    pub limit: Arc<LimitDefinition>,
    pub key: CompiledKey,
}

/// Everything the interceptor needs about an operation, computed once.
#[derive(Debug)]
pub struct BoundOperation {
    spec: OperationSpec,
    params: HashSet<String>,
    scopes: Vec<BoundScope>,
}

impl BoundOperation {
    pub fn new(spec: OperationSpec, params: HashSet<String>, scopes: Vec<BoundScope>) -> Self {
        Self { spec, params, scopes }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn cost_source(&self) -> CostSource {
        self.spec.cost
    }

    pub fn has_route_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Scopes in evaluation order.
    pub fn scopes(&self) -> &[BoundScope] {
        &self.scopes
    }
}
