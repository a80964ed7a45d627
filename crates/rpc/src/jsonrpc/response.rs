use axum::response::IntoResponse;
use serde_json::Value;

use crate::error::ApplicationError;
use crate::jsonrpc::error::RpcError;
use crate::jsonrpc::RequestId;

pub type RpcResult = Result<Value, RpcError>;

/// The reply to a single request. Notifications never produce one, so
/// [RequestId::Notification] only shows up here in tests.
#[derive(Debug, PartialEq)]
pub struct RpcResponse {
    pub output: RpcResult,
    pub id: RequestId,
}

impl RpcResponse {
    /// The body was not valid JSON.
    pub const fn parse_error(reason: String) -> RpcResponse {
        Self::framing_error(RpcError::ParseError(reason))
    }

    /// The body was JSON, but not a JSON-RPC request.
    pub const fn invalid_request(reason: String) -> RpcResponse {
        Self::framing_error(RpcError::InvalidRequest(reason))
    }

    // The id of a request which could not be read is unknown.
    const fn framing_error(error: RpcError) -> RpcResponse {
        Self {
            output: Err(error),
            id: RequestId::Null,
        }
    }

    pub const fn method_not_found(id: RequestId) -> RpcResponse {
        Self {
            output: Err(RpcError::MethodNotFound),
            id,
        }
    }

    /// Logs the details of internal errors, which the caller never sees.
    pub(crate) fn log_internal_error(&self) {
        let Err(error) = &self.output else {
            return;
        };

        match error {
            RpcError::InternalError(e)
            | RpcError::ApplicationError(ApplicationError::Internal(e)) => {
                tracing::warn!(id=?self.id, error=?e, "Internal error");
            }
            _ => {}
        }
    }
}

impl serde::Serialize for RpcResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::Serialize;

        #[derive(Serialize)]
        struct Body<'a> {
            jsonrpc: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            result: Option<&'a Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a RpcError>,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<Value>,
        }

        let id = match &self.id {
            RequestId::Number(n) => Some(Value::from(*n)),
            RequestId::String(s) => Some(Value::from(s.as_str())),
            RequestId::Null => Some(Value::Null),
            RequestId::Notification => None,
        };

        Body {
            jsonrpc: "2.0",
            result: self.output.as_ref().ok(),
            error: self.output.as_ref().err(),
            id,
        }
        .serialize(serializer)
    }
}

impl IntoResponse for RpcResponse {
    fn into_response(self) -> axum::response::Response {
        self.log_internal_error();

        json_response(&self)
    }
}

/// Serializes `body` into a JSON HTTP response.
pub(crate) fn json_response<T: serde::Serialize>(body: &T) -> axum::response::Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            [(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            )],
            bytes,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "Failed to serialize JSON-RPC response");
            http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
