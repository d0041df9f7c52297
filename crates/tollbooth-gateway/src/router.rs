//! Axum router wiring.
//!
//! Operational endpoints are open; every ingest route is wrapped in the
//! admission middleware bound to its operation.

use axum::routing::{get, post, put, MethodRouter};
use axum::Router;
use tollbooth_core::error::Result;

use crate::app_state::AppState;
use crate::ingest::{self, handlers};
use crate::registry::OperationSpec;
use crate::{admission, ops};

fn protected(state: &AppState, spec: &OperationSpec, route: MethodRouter<AppState>) -> Result<MethodRouter<AppState>> {
    Ok(admission::guard(state, state.operation(spec.name)?, route))
}

pub fn build_router(state: AppState) -> Result<Router> {
    let traces = protected(&state, &ingest::TRACES_BATCH, post(handlers::ingest_traces))?;
    let spans = protected(&state, &ingest::SPANS_BATCH, post(handlers::ingest_spans))?;
    let scores = protected(&state, &ingest::FEEDBACK_SCORES, put(handlers::ingest_feedback_scores))?;
    let guardrails = protected(&state, &ingest::GUARDRAILS, post(handlers::ingest_guardrails))?;
    let items = protected(&state, &ingest::EXPERIMENT_ITEMS, post(handlers::ingest_experiment_items))?;

    Ok(Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route(ingest::TRACES_BATCH.path, traces)
        .route(ingest::SPANS_BATCH.path, spans)
        .route(ingest::FEEDBACK_SCORES.path, scores)
        .route(ingest::GUARDRAILS.path, guardrails)
        .route(ingest::EXPERIMENT_ITEMS.path, items)
        .with_state(state))
}
