//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use tollbooth_core::error::{GateError, Result};

pub use schema::{
    ContextSection, FailurePolicy, GatewayConfig, LimitSpec, RateLimitSection, ServerSection,
    StoreBackend, StoreSection,
};

/// Env var overriding the config path.
pub const CONFIG_ENV: &str = "TOLLBOOTH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "tollbooth.yaml";

pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GateError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
