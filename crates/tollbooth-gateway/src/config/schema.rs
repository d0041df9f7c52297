use std::collections::BTreeMap;

use serde::Deserialize;
use tollbooth_core::error::{GateError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub context: ContextSection,

    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GateError::Config(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }

        self.server.validate()?;
        self.context.validate()?;
        self.rate_limit.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upper bound on buffered request bodies (batch cost extraction).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1024..=256 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(GateError::Config(
                "server.max_body_bytes must be between 1KiB and 256MiB".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// Where request identity comes from. Authentication itself happens upstream;
/// by the time a request reaches us these headers are trusted.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSection {
    #[serde(default = "default_caller_header")]
    pub caller_header: String,

    #[serde(default = "default_workspace_header")]
    pub workspace_header: String,

    /// Workspace used when the request carries none.
    #[serde(default = "default_workspace")]
    pub default_workspace: String,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            caller_header: default_caller_header(),
            workspace_header: default_workspace_header(),
            default_workspace: default_workspace(),
        }
    }
}

impl ContextSection {
    pub fn validate(&self) -> Result<()> {
        if self.caller_header.trim().is_empty() || self.workspace_header.trim().is_empty() {
            return Err(GateError::Config("context header names must not be empty".into()));
        }
        if self.default_workspace.trim().is_empty() {
            return Err(GateError::Config("context.default_workspace must not be empty".into()));
        }
        Ok(())
    }
}

fn default_caller_header() -> String {
    "x-caller-id".into()
}
fn default_workspace_header() -> String {
    "x-workspace-id".into()
}
fn default_workspace() -> String {
    "default".into()
}

/// What to do when the quota store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request and record the bypass.
    #[default]
    Open,
    /// Refuse the request with 503.
    Closed,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePolicy::Open => "open",
            FailurePolicy::Closed => "closed",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Leading component of every quota response header.
    #[serde(default = "default_header_prefix")]
    pub header_prefix: String,

    /// Namespace prepended to every counter key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default = "default_general")]
    pub general: LimitSpec,

    #[serde(default)]
    pub workspace: Option<LimitSpec>,

    #[serde(default)]
    pub custom: BTreeMap<String, LimitSpec>,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_policy: FailurePolicy::default(),
            header_prefix: default_header_prefix(),
            key_prefix: default_key_prefix(),
            store: StoreSection::default(),
            general: default_general(),
            workspace: None,
            custom: BTreeMap::new(),
        }
    }
}

impl RateLimitSection {
    pub fn validate(&self) -> Result<()> {
        if self.header_prefix.trim().is_empty() {
            return Err(GateError::Config("rate_limit.header_prefix must not be empty".into()));
        }
        self.store.validate()?;
        self.general.validate("rate_limit.general")?;
        if let Some(ws) = &self.workspace {
            ws.validate("rate_limit.workspace")?;
        }
        for (name, spec) in &self.custom {
            let at = format!("rate_limit.custom.{name}");
            if name.trim().is_empty() {
                return Err(GateError::Config("custom limit names must not be empty".into()));
            }
            spec.validate(&at)?;
            if spec.key.is_none() {
                return Err(GateError::Config(format!("{at}.key is required for custom limits")));
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_header_prefix() -> String {
    "Tollbooth".into()
}
fn default_key_prefix() -> String {
    "tollbooth:".into()
}
fn default_general() -> LimitSpec {
    LimitSpec {
        quota: 10_000,
        window_ms: 60_000,
        key: None,
        header: None,
        error_message: None,
    }
}

/// One limit as written in YAML. Missing `key`/`header`/`error_message`
/// fall back to scope-specific defaults when the registry is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitSpec {
    pub quota: u64,
    pub window_ms: u64,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl LimitSpec {
    pub fn validate(&self, at: &str) -> Result<()> {
        if self.window_ms == 0 {
            return Err(GateError::Config(format!("{at}.window_ms must be greater than 0")));
        }
        if let Some(h) = &self.header {
            if h.trim().is_empty() {
                return Err(GateError::Config(format!("{at}.header must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process counters. Exact only within a single gateway instance.
    #[default]
    Memory,
    /// Shared Redis counters for multi-instance deployments.
    Redis,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub redis_url: Option<String>,

    /// Hard deadline for one scope check, retries included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Memory backend only: how often expired counters are evicted.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StoreBackend::Redis
            && self.redis_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(GateError::Config(
                "rate_limit.store.redis_url is required when backend is redis".into(),
            ));
        }
        if !(1..=10_000).contains(&self.timeout_ms) {
            return Err(GateError::Config(
                "rate_limit.store.timeout_ms must be between 1 and 10000".into(),
            ));
        }
        if !(1..=10).contains(&self.retry_attempts) {
            return Err(GateError::Config(
                "rate_limit.store.retry_attempts must be between 1 and 10".into(),
            ));
        }
        if self.retry_backoff_ms >= self.timeout_ms {
            return Err(GateError::Config(
                "rate_limit.store.retry_backoff_ms must be less than timeout_ms".into(),
            ));
        }
        if self.sweep_interval_ms < 100 {
            return Err(GateError::Config(
                "rate_limit.store.sweep_interval_ms must be at least 100".into(),
            ));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    100
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    10
}
fn default_sweep_interval_ms() -> u64 {
    30_000
}
