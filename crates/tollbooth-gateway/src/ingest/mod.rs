//! Protected ingest operations.
//!
//! Persistence is owned elsewhere: handlers hand admitted batches to an
//! `EventSink`. What lives here is the admission marker of every route.

pub mod handlers;
pub mod sink;

use crate::registry::{CostSource, OperationSpec};

pub use sink::{DiscardSink, EventKind, EventSink};

pub const TRACES_BATCH: OperationSpec = OperationSpec {
    name: "traces.batch",
    path: "/v1/private/traces/batch",
    custom_limit: None,
    workspace_scope: true,
    cost: CostSource::BatchField("traces"),
};

pub const SPANS_BATCH: OperationSpec = OperationSpec {
    name: "spans.batch",
    path: "/v1/private/spans/batch",
    custom_limit: None,
    workspace_scope: true,
    cost: CostSource::BatchField("spans"),
};

pub const FEEDBACK_SCORES: OperationSpec = OperationSpec {
    name: "traces.feedback_scores",
    path: "/v1/private/traces/feedback-scores",
    custom_limit: None,
    workspace_scope: true,
    cost: CostSource::BatchField("scores"),
};

pub const GUARDRAILS: OperationSpec = OperationSpec {
    name: "guardrails.batch",
    path: "/v1/private/guardrails",
    custom_limit: None,
    workspace_scope: true,
    cost: CostSource::BatchField("guardrails"),
};

pub const EXPERIMENT_ITEMS: OperationSpec = OperationSpec {
    name: "experiments.items",
    path: "/v1/private/experiments/:experiment_id/items",
    custom_limit: Some("experiment_items"),
    workspace_scope: false,
    cost: CostSource::BatchField("items"),
};

/// Every protected operation, bound at startup.
pub const OPERATIONS: [OperationSpec; 5] =
    [TRACES_BATCH, SPANS_BATCH, FEEDBACK_SCORES, GUARDRAILS, EXPERIMENT_ITEMS];
