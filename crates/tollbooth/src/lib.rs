//! Top-level facade crate for Tollbooth.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use tollbooth_core::*;
}

pub mod gateway {
    pub use tollbooth_gateway::*;
}
