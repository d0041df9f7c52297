//! Limit registry and key resolution.
//!
//! Compiles rate-limit configuration into immutable limit definitions, then
//! binds each protected operation to its ordered scope list once, at router
//! build time. Nothing in here runs per request except `CompiledKey::render`.

pub mod key;
pub mod limits;
pub mod operation;

pub use key::{CompiledKey, KeyPart};
pub use limits::{LimitDefinition, LimitRegistry, ScopeHeaders, ScopeKind};
pub use operation::{BoundOperation, BoundScope, CostSource, OperationSpec};
