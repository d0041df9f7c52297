//! Tollbooth core: transport-agnostic admission primitives and error types.
//!
//! This crate defines the quota accounting vocabulary (consumption results,
//! event costs, key templates) and the error surface shared by the gateway and
//! any alternative store backends. It carries no transport or runtime
//! dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as `GateError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod quota;
pub mod template;

pub use error::{GateError, Result};
pub use quota::{ConsumptionResult, EventCost};
pub use template::{escape_value, KeyTemplate, Segment};
