//! Tollbooth gateway library entry.
//!
//! This crate wires configuration, the limit registry, quota stores, the
//! admission middleware and the protected ingest routes into one axum
//! service. It is consumed by the binary (`main.rs`) and by integration tests.

pub mod admission;
pub mod app_state;
pub mod config;
pub mod context;
pub mod ingest;
pub mod obs;
pub mod ops;
pub mod registry;
pub mod response;
pub mod router;
pub mod store;
