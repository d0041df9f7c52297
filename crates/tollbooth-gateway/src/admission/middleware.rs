//! Per-route admission middleware.
//!
//! `RESOLVE_CONTEXT -> RESOLVE_SCOPES -> EVALUATE_SCOPES -> PROCEED | REJECT`
//!
//! Each protected route gets its own `GuardedRoute` state at router build time,
//! so the bound scope list and cost source are captured once and never looked
//! up per request. Cost is extracted by buffering the body before the handler
//! runs; a rejected request therefore never reaches the handler at all.
//! With admission disabled only the context is resolved; the body is left alone.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tollbooth_core::error::{GateError, Result};
use tollbooth_core::EventCost;

use crate::app_state::AppState;
use crate::context::RequestContext;
use crate::registry::{BoundOperation, CostSource};
use crate::response;

use super::controller::Verdict;

/// Middleware state for one protected route.
#[derive(Clone)]
pub struct GuardedRoute {
    pub app: AppState,
    pub op: Arc<BoundOperation>,
}

/// Entry point used with `axum::middleware::from_fn_with_state`.
pub async fn admit(State(route): State<GuardedRoute>, req: Request, next: Next) -> Response {
    match run(&route, req, next).await {
        Ok(resp) => resp,
        Err(e) => {
            route
                .app
                .metrics()
                .request_errors
                .inc(&[("code", e.client_code().as_str())]);
            match &e {
                GateError::Internal(_) | GateError::Config(_) => {
                    tracing::error!(op = route.op.name(), error = %e, "admission failed")
                }
                _ => tracing::debug!(op = route.op.name(), error = %e, "request refused before admission"),
            }
            response::error_response(&e)
        }
    }
}

async fn run(route: &GuardedRoute, req: Request, next: Next) -> Result<Response> {
    let app = &route.app;
    let op = route.op.as_ref();

    // RESOLVE_CONTEXT
    let (mut parts, body) = req.into_parts();
    let ctx = resolve_context(app, op, &mut parts).await?;

    let controller = app.admission();
    if !controller.enabled() {
        parts.extensions.insert(ctx);
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    // Cost is known before anything is consumed or executed.
    let (cost, body) = extract_cost(op.cost_source(), body, app.cfg().server.max_body_bytes).await?;
    parts.extensions.insert(ctx.clone());
    let req = Request::from_parts(parts, body);

    // RESOLVE_SCOPES happened at bind time; EVALUATE_SCOPES:
    match controller.evaluate(op, &ctx, cost).await? {
        Verdict::Admit { evaluated } => {
            let mut resp = next.run(req).await;
            response::decorate(resp.headers_mut(), &evaluated);
            Ok(resp)
        }
        Verdict::Reject { evaluated, failed } => Ok(response::too_many_requests(&evaluated, &failed)),
        Verdict::Unavailable { scope, reason } => {
            tracing::warn!(op = op.name(), scope = %scope.scope_id, %reason, "rejecting request, quota store unavailable");
            Ok(response::store_unavailable())
        }
    }
}

async fn resolve_context(app: &AppState, op: &BoundOperation, parts: &mut Parts) -> Result<RequestContext> {
    let ctx = app.context_resolver().resolve(&parts.headers)?;
    if !op.has_route_params() {
        return Ok(ctx);
    }
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, &())
        .await
        .map_err(|e| GateError::BadRequest(format!("invalid path parameters: {e}")))?;
    Ok(ctx.with_params(params))
}

/// Count batch items without handing the body to the operation yet.
pub async fn extract_cost(source: CostSource, body: Body, limit: usize) -> Result<(EventCost, Body)> {
    match source {
        CostSource::Unit => Ok((EventCost::ONE, body)),
        CostSource::BatchField(field) => {
            let bytes = to_bytes(body, limit).await.map_err(|_| GateError::PayloadTooLarge)?;
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| GateError::BadRequest(format!("invalid json body: {e}")))?;
            let items = value
                .get(field)
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| GateError::BadRequest(format!("body must contain an array field `{field}`")))?;
            Ok((EventCost::from_batch_len(items.len()), Body::from(bytes)))
        }
    }
}
