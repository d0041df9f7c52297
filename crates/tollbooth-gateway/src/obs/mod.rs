//! Lightweight in-process metrics.
//!
//! Admission outcomes, store failures and store latency are kept as atomics
//! and rendered in Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::GatewayMetrics;
