//! Contains the JSON-RPC framework and its components.
mod error;
mod request;
mod response;
mod router;

pub use error::RpcError;
pub use router::{rpc_handler, RpcRouter, RpcRouterBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
    /// The request carried no id and expects no response.
    Notification,
}

impl RequestId {
    pub fn is_notification(&self) -> bool {
        self == &RequestId::Notification
    }
}
