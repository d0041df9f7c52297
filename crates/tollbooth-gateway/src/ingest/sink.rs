use async_trait::async_trait;
use serde_json::Value;
use tollbooth_core::error::Result;

use crate::context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Trace,
    Span,
    FeedbackScore,
    Guardrail,
    ExperimentItem,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Trace => "trace",
            EventKind::Span => "span",
            EventKind::FeedbackScore => "feedback_score",
            EventKind::Guardrail => "guardrail",
            EventKind::ExperimentItem => "experiment_item",
        }
    }
}

/// Persistence seam for admitted events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn ingest(&self, ctx: &RequestContext, kind: EventKind, items: Vec<Value>) -> Result<()>;
}

/// Accepts and drops everything. Used when no storage is wired in.
#[derive(Debug, Default)]
pub struct DiscardSink;

#[async_trait]
impl EventSink for DiscardSink {
    async fn ingest(&self, ctx: &RequestContext, kind: EventKind, items: Vec<Value>) -> Result<()> {
        tracing::debug!(
            workspace = ctx.workspace_id(),
            kind = kind.as_str(),
            count = items.len(),
            "events discarded"
        );
        Ok(())
    }
}
