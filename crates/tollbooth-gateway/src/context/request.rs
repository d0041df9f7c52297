use std::collections::HashMap;

use axum::http::HeaderMap;
use tollbooth_core::error::{GateError, Result};

use crate::config::ContextSection;

/// Immutable identity and routing data for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller identifier (API key owner / user).
    pub user_id: String,
    /// Workspace the request acts on.
    pub workspace_id: String,
    /// Matched route path parameters, e.g. `experiment_id`.
    pub params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Turns request headers into a `RequestContext`.
pub trait ContextResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Result<RequestContext>;
}

/// Reads caller and workspace from headers set by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct HeaderContextResolver {
    caller_header: String,
    workspace_header: String,
    default_workspace: String,
}

impl HeaderContextResolver {
    pub fn new(cfg: &ContextSection) -> Self {
        Self {
            caller_header: cfg.caller_header.to_ascii_lowercase(),
            workspace_header: cfg.workspace_header.to_ascii_lowercase(),
            default_workspace: cfg.default_workspace.clone(),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        None => Ok(None),
        Some(v) => {
            let s = v
                .to_str()
                .map_err(|_| GateError::BadRequest(format!("header {name} is not valid ascii")))?
                .trim();
            Ok(if s.is_empty() { None } else { Some(s) })
        }
    }
}

impl ContextResolver for HeaderContextResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<RequestContext> {
        let user = header_value(headers, &self.caller_header)?.ok_or(GateError::AuthFailed)?;
        let workspace = header_value(headers, &self.workspace_header)?
            .unwrap_or(self.default_workspace.as_str());
        Ok(RequestContext::new(user, workspace))
    }
}
