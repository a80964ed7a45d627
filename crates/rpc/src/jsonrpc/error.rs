use std::borrow::Cow;

use serde_json::{json, Value};

use crate::error::ApplicationError;

/// Everything a JSON-RPC request can fail with: the protocol level errors
/// from <https://www.jsonrpc.org/specification#error_object> and the
/// method specific [ApplicationError]s.
#[derive(Debug)]
pub enum RpcError {
    ParseError(String),
    InvalidRequest(String),
    MethodNotFound,
    InvalidParams(String),
    InternalError(anyhow::Error),
    ApplicationError(ApplicationError),
}

// Errors compare by what the caller would see.
impl PartialEq for RpcError {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code() && self.message() == other.message() && self.data() == other.data()
    }
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::ParseError(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::InternalError(_) => -32603,
            RpcError::ApplicationError(e) => e.code(),
        }
    }

    pub fn message(&self) -> Cow<'_, str> {
        let message = match self {
            RpcError::ParseError(_) => "Parse error",
            RpcError::InvalidRequest(_) => "Invalid request",
            RpcError::MethodNotFound => "Method not found",
            RpcError::InvalidParams(_) => "Invalid params",
            RpcError::InternalError(_) => "Internal error",
            RpcError::ApplicationError(e) => return Cow::Owned(e.message()),
        };
        Cow::Borrowed(message)
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            RpcError::ParseError(reason)
            | RpcError::InvalidRequest(reason)
            | RpcError::InvalidParams(reason) => Some(json!({ "reason": reason })),
            RpcError::MethodNotFound
            | RpcError::InternalError(_)
            | RpcError::ApplicationError(_) => None,
        }
    }
}

impl serde::Serialize for RpcError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorObject<'a> {
            code: i32,
            message: Cow<'a, str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            data: Option<Value>,
        }

        ErrorObject {
            code: self.code(),
            message: self.message(),
            data: self.data(),
        }
        .serialize(serializer)
    }
}

impl<E: Into<ApplicationError>> From<E> for RpcError {
    fn from(value: E) -> Self {
        Self::ApplicationError(value.into())
    }
}
