//! Starknet JSON-RPC query methods served over HTTP.
mod calldata;
pub mod context;
mod error;
mod felt;
mod jsonrpc;
pub(crate) mod method;
pub mod middleware;
#[cfg(test)]
mod test_utils;
mod types;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
pub use context::{RpcConfig, RpcContext};
use http_body::Body;
use lantern_common::AllowedOrigins;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::ServiceBuilderExt;

use crate::jsonrpc::rpc_handler;

const DEFAULT_MAX_CONNECTIONS: usize = 1024;

const REQUEST_MAX_SIZE: usize = 10 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP server for the query methods, listening on both `/` and `/rpc/v0_1`.
pub struct RpcServer {
    addr: SocketAddr,
    context: RpcContext,
    max_connections: usize,
    cors: Option<CorsLayer>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, context: RpcContext) -> Self {
        Self {
            addr,
            context,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            cors: None,
        }
    }

    /// Requests beyond this many in flight wait for a free slot.
    pub fn with_max_connections(self, max_connections: usize) -> Self {
        Self {
            max_connections,
            ..self
        }
    }

    pub fn with_cors(self, allowed_origins: AllowedOrigins) -> Self {
        Self {
            cors: Some(middleware::cors::with_allowed_origins(allowed_origins)),
            ..self
        }
    }

    /// Binds the listener and serves requests on a background task. Returns
    /// the task together with the bound address, which differs from the
    /// configured one when port 0 was requested.
    pub async fn spawn(self) -> anyhow::Result<(JoinHandle<anyhow::Result<()>>, SocketAddr)> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| {
                format!(
                    "Binding RPC server to {}. Is another lantern instance already using this \
                     address?",
                    self.addr
                )
            })?;
        let addr = listener
            .local_addr()
            .context("Reading RPC server address")?;

        let app = self.into_router();
        let server = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .await
                .context("Serving RPC requests")
        });

        tracing::info!(%addr, "RPC server listening");

        Ok((server, addr))
    }

    fn into_router(self) -> axum::Router {
        use axum::routing::{get, post};

        // Layers wrap in the order listed, so the request id is in place
        // before the tracing span is created.
        let layers = tower::ServiceBuilder::new()
            .layer(HandleErrorLayer::new(middleware_error))
            .set_x_request_id(middleware::request_id::RequestIdSource::default())
            .concurrency_limit(self.max_connections)
            .layer(DefaultBodyLimit::max(REQUEST_MAX_SIZE))
            .timeout(REQUEST_TIMEOUT)
            .layer(middleware::tracing::trace_layer())
            .option_layer(self.cors)
            .propagate_x_request_id();

        let methods = method::register_routes().build(self.context);

        axum::Router::new()
            .route("/", get(health_check).post(rpc_handler))
            .route("/rpc/v0_1", post(rpc_handler))
            .with_state(methods)
            .layer(layers)
    }
}

/// Turns errors raised by the tower layers into HTTP responses.
async fn middleware_error(error: axum::BoxError) -> (http::StatusCode, &'static str) {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (http::StatusCode::REQUEST_TIMEOUT, "Request took too long");
    }

    tracing::warn!(%error, "Unhandled middleware error");
    (http::StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

/// Liveness check: an empty GET succeeds, anything with a body is refused
/// without reading it.
async fn health_check(request: axum::extract::Request) -> http::StatusCode {
    if request.body().is_end_stream() {
        http::StatusCode::OK
    } else {
        http::StatusCode::METHOD_NOT_ALLOWED
    }
}
