//! HTTP layers wrapped around the JSON-RPC routes.
pub mod cors;
pub(crate) mod request_id;
pub(crate) mod tracing;
