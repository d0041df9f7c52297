use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tollbooth_core::error::GateError;

use crate::app_state::AppState;
use crate::context::RequestContext;
use crate::response;

use super::EventKind;

#[derive(Debug, Deserialize)]
pub struct TraceBatch {
    traces: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SpanBatch {
    spans: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreBatch {
    scores: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct GuardrailBatch {
    guardrails: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ExperimentItemBatch {
    items: Vec<Value>,
}

async fn accept(app: &AppState, ctx: &RequestContext, kind: EventKind, items: Vec<Value>) -> Response {
    if items.is_empty() {
        return response::error_response(&GateError::BadRequest(format!(
            "{} batch must not be empty",
            kind.as_str()
        )));
    }
    match app.sink().ingest(ctx, kind, items).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(kind = kind.as_str(), error = %e, "event sink failed");
            response::error_response(&e)
        }
    }
}

pub async fn ingest_traces(
    State(app): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<TraceBatch>,
) -> Response {
    accept(&app, &ctx, EventKind::Trace, body.traces).await
}

pub async fn ingest_spans(
    State(app): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<SpanBatch>,
) -> Response {
    accept(&app, &ctx, EventKind::Span, body.spans).await
}

pub async fn ingest_feedback_scores(
    State(app): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<ScoreBatch>,
) -> Response {
    accept(&app, &ctx, EventKind::FeedbackScore, body.scores).await
}

pub async fn ingest_guardrails(
    State(app): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<GuardrailBatch>,
) -> Response {
    accept(&app, &ctx, EventKind::Guardrail, body.guardrails).await
}

pub async fn ingest_experiment_items(
    State(app): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(experiment_id): Path<String>,
    Json(body): Json<ExperimentItemBatch>,
) -> Response {
    tracing::debug!(%experiment_id, count = body.items.len(), "experiment items admitted");
    accept(&app, &ctx, EventKind::ExperimentItem, body.items).await
}

