//! Request context types shared across layers.
//!
//! Authentication and workspace resolution live upstream; this module only
//! reads their outcome off the request and hands it to the admission path as
//! an explicit value.

pub mod request;

pub use request::{ContextResolver, HeaderContextResolver, RequestContext};
