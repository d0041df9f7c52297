use std::collections::HashSet;

use tollbooth_core::error::{GateError, Result};
use tollbooth_core::template::{escape_value, KeyTemplate, Segment};

use crate::context::RequestContext;

/// Placeholder bound to the caller id.
pub const USER_ID: &str = "user_id";
/// Placeholder bound to the workspace id.
pub const WORKSPACE_ID: &str = "workspace_id";

/// A template segment with its source decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    Literal(String),
    UserId,
    WorkspaceId,
    Param(String),
}

/// Key template compiled against a known set of route parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKey {
    prefix: String,
    parts: Vec<KeyPart>,
}

impl CompiledKey {
    /// Bind every placeholder of `template`. Anything that is neither a context
    /// field nor one of `params` is a configuration error.
    pub fn compile(prefix: &str, template: &KeyTemplate, params: &HashSet<String>) -> Result<Self> {
        let mut parts = Vec::with_capacity(template.segments().len());
        for seg in template.segments() {
            let part = match seg {
                Segment::Literal(s) => KeyPart::Literal(s.clone()),
                Segment::Placeholder(name) if name == USER_ID => KeyPart::UserId,
                Segment::Placeholder(name) if name == WORKSPACE_ID => KeyPart::WorkspaceId,
                Segment::Placeholder(name) if params.contains(name) => KeyPart::Param(name.clone()),
                Segment::Placeholder(name) => {
                    return Err(GateError::Config(format!(
                        "unresolvable placeholder {{{name}}} in key template {}",
                        template.as_str()
                    )));
                }
            };
            parts.push(part);
        }
        Ok(Self { prefix: prefix.to_string(), parts })
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Produce the concrete counter key for one request. Substituted values
    /// are escaped; literals are copied as written.
    pub fn render(&self, ctx: &RequestContext) -> Result<String> {
        let mut out = String::with_capacity(self.prefix.len() + 48);
        out.push_str(&self.prefix);
        for part in &self.parts {
            match part {
                KeyPart::Literal(s) => out.push_str(s),
                KeyPart::UserId => out.push_str(&escape_value(ctx.user_id())),
                KeyPart::WorkspaceId => out.push_str(&escape_value(ctx.workspace_id())),
                KeyPart::Param(name) => {
                    // Bound params come from the route pattern, so the router
                    // always supplies them.
                    let v = ctx.param(name).ok_or_else(|| {
                        GateError::Internal(format!("route parameter {name} missing from request"))
                    })?;
                    out.push_str(&escape_value(v));
                }
            }
        }
        Ok(out)
    }
}
