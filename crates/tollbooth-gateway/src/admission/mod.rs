//! Admission interceptor: the request-path quota gate.
//!
//! `controller` decides (scopes -> store -> verdict); `middleware` is the axum
//! glue that resolves context and cost around a protected route.

pub mod controller;
pub mod middleware;

use std::sync::Arc;

use axum::routing::MethodRouter;

use crate::app_state::AppState;
use crate::registry::BoundOperation;

pub use controller::{AdmissionController, RetryPolicy, ScopeOutcome, Verdict};
pub use middleware::{admit, extract_cost, GuardedRoute};

/// Wrap a route's handlers with the admission middleware for `op`.
pub fn guard(app: &AppState, op: Arc<BoundOperation>, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let state = GuardedRoute { app: app.clone(), op };
    route.route_layer(axum::middleware::from_fn_with_state(state, admit))
}
