use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use tollbooth_core::error::{GateError, Result};
use tollbooth_core::template::KeyTemplate;

use crate::config::{LimitSpec, RateLimitSection};

use super::key::CompiledKey;
use super::operation::{BoundOperation, BoundScope, OperationSpec};

/// Longest window a limit may declare.
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Which dimension a limit belongs to. Also the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScopeKind {
    General,
    Workspace,
    Custom,
}

impl ScopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::General => "general",
            ScopeKind::Workspace => "workspace",
            ScopeKind::Custom => "custom",
        }
    }
}

/// Response header names for one scope, validated at startup.
#[derive(Debug, Clone)]
pub struct ScopeHeaders {
    pub limit: HeaderName,
    pub remaining: HeaderName,
    pub remaining_ttl: HeaderName,
}

impl ScopeHeaders {
    fn new(prefix: &str, display: &str) -> Result<Self> {
        let make = |suffix: &str| {
            let name = format!("{prefix}-{display}-{suffix}");
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GateError::Config(format!("invalid response header name: {name}")))
        };
        Ok(Self {
            limit: make("Limit")?,
            remaining: make("Remaining-Limit")?,
            remaining_ttl: make("Remaining-Limit-TTL-Millis")?,
        })
    }
}

/// One immutable limit, built once from configuration.
#[derive(Debug)]
pub struct LimitDefinition {
    pub scope_id: String,
    pub kind: ScopeKind,
    pub template: KeyTemplate,
    pub quota: u64,
    pub window: Duration,
    pub headers: ScopeHeaders,
    pub error_message: String,
}

impl LimitDefinition {
    fn build(
        scope_id: &str,
        kind: ScopeKind,
        spec: &LimitSpec,
        default_key: &str,
        default_header: &str,
        default_message: &str,
        header_prefix: &str,
    ) -> Result<Self> {
        let window = Duration::from_millis(spec.window_ms);
        if window.is_zero() {
            return Err(GateError::Config(format!("limit {scope_id}: window must be greater than 0")));
        }
        if window > MAX_WINDOW {
            return Err(GateError::Config(format!("limit {scope_id}: window exceeds 366 days")));
        }
        let template = KeyTemplate::parse(spec.key.as_deref().unwrap_or(default_key))
            .map_err(|e| GateError::Config(format!("limit {scope_id}: {e}")))?;
        let display = spec.header.as_deref().unwrap_or(default_header);
        let headers = ScopeHeaders::new(header_prefix, display)?;
        let error_message = spec
            .error_message
            .clone()
            .unwrap_or_else(|| default_message.to_string());

        Ok(Self {
            scope_id: scope_id.to_string(),
            kind,
            template,
            quota: spec.quota,
            window,
            headers,
            error_message,
        })
    }
}

/// All configured limits plus the precompiled keys of the fixed scopes.
#[derive(Debug)]
pub struct LimitRegistry {
    key_prefix: String,
    general: BoundScope,
    workspace: Option<BoundScope>,
    custom: BTreeMap<String, Arc<LimitDefinition>>,
}

impl LimitRegistry {
    pub fn from_config(cfg: &RateLimitSection) -> Result<Self> {
        let prefix = cfg.header_prefix.as_str();
        let no_params = HashSet::new();

        let general = Arc::new(LimitDefinition::build(
            "general",
            ScopeKind::General,
            &cfg.general,
            "general:{user_id}",
            "User",
            "You have exceeded the rate limit for user events. Please try again later.",
            prefix,
        )?);
        let general = BoundScope {
            key: CompiledKey::compile(&cfg.key_prefix, &general.template, &no_params)?,
            limit: general,
        };

        let workspace = match &cfg.workspace {
            Some(spec) => {
                let def = Arc::new(LimitDefinition::build(
                    "workspace",
                    ScopeKind::Workspace,
                    spec,
                    "workspace:{workspace_id}",
                    "Workspace",
                    "You have exceeded the rate limit for workspace events. Please try again later.",
                    prefix,
                )?);
                Some(BoundScope {
                    key: CompiledKey::compile(&cfg.key_prefix, &def.template, &no_params)?,
                    limit: def,
                })
            }
            None => None,
        };

        let mut custom = BTreeMap::new();
        for (name, spec) in &cfg.custom {
            let message = format!("You have exceeded the rate limit for {name}. Please try again later.");
            let def = LimitDefinition::build(
                name,
                ScopeKind::Custom,
                spec,
                "",
                name,
                &message,
                prefix,
            )?;
            custom.insert(name.clone(), Arc::new(def));
        }

        Ok(Self {
            key_prefix: cfg.key_prefix.clone(),
            general,
            workspace,
            custom,
        })
    }

    pub fn general(&self) -> &Arc<LimitDefinition> {
        &self.general.limit
    }

    pub fn workspace(&self) -> Option<&Arc<LimitDefinition>> {
        self.workspace.as_ref().map(|s| &s.limit)
    }

    pub fn custom(&self, name: &str) -> Option<&Arc<LimitDefinition>> {
        self.custom.get(name)
    }

    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    /// Resolve the ordered scope list for one operation.
    ///
    /// Order is fixed: general, workspace, custom. Placeholders of the custom
    /// key may reference the operation's route parameters; anything else that
    /// does not resolve is a configuration error.
    pub fn bind(&self, spec: &OperationSpec) -> Result<BoundOperation> {
        let params = spec.route_params();
        let mut scopes = vec![self.general.clone()];

        if spec.workspace_scope {
            match &self.workspace {
                Some(ws) => scopes.push(ws.clone()),
                None => tracing::warn!(
                    op = spec.name,
                    "operation requests the workspace scope but rate_limit.workspace is not configured"
                ),
            }
        }

        if let Some(name) = spec.custom_limit {
            match self.custom.get(name) {
                Some(def) => {
                    let key = CompiledKey::compile(&self.key_prefix, &def.template, &params)
                        .map_err(|e| GateError::Config(format!("operation {}: custom limit {name}: {e}", spec.name)))?;
                    scopes.push(BoundScope { limit: Arc::clone(def), key });
                }
                None => tracing::warn!(
                    op = spec.name,
                    limit = name,
                    "operation references a custom limit that is not configured; scope skipped"
                ),
            }
        }

        Ok(BoundOperation::new(*spec, params, scopes))
    }
}
