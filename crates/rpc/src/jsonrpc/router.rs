use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::Instrument;

use crate::context::RpcContext;
use crate::jsonrpc::request::{RawParams, RpcRequest};
use crate::jsonrpc::response::{json_response, RpcResponse, RpcResult};
use crate::jsonrpc::RpcError;

#[async_trait::async_trait]
pub trait RpcMethodEndpoint: Send + Sync {
    async fn invoke<'a>(&self, state: RpcContext, input: RawParams<'a>) -> RpcResult;
}

/// Conversion of an async method handler into a routable endpoint.
///
/// This is automatically implemented for methods of the form
/// ```ignore
/// async fn example(RpcContext, impl Deserialize) -> Result<impl Serialize, impl Into<RpcError>>
/// ```
///
/// The generics exist only to name the handler's input, output and error
/// types and can be ignored by callers.
pub trait IntoRpcEndpoint<Input, Output, Error> {
    #[doc(hidden)]
    fn into_endpoint(self) -> Arc<dyn RpcMethodEndpoint>;
}

impl<F, Input, Output, Error, Fut> IntoRpcEndpoint<Input, Output, Error> for F
where
    F: Fn(RpcContext, Input) -> Fut + Sync + Send + 'static,
    Input: DeserializeOwned + Send + Sync + 'static,
    Output: Serialize + Send + Sync + 'static,
    Error: Into<RpcError> + Send + Sync + 'static,
    Fut: Future<Output = Result<Output, Error>> + Send,
{
    fn into_endpoint(self) -> Arc<dyn RpcMethodEndpoint> {
        struct Helper<F, Input, Output, Error> {
            f: F,
            _marker: PhantomData<fn() -> (Input, Output, Error)>,
        }

        #[async_trait::async_trait]
        impl<F, Input, Output, Error, Fut> RpcMethodEndpoint for Helper<F, Input, Output, Error>
        where
            F: Fn(RpcContext, Input) -> Fut + Sync + Send,
            Input: DeserializeOwned + Send + Sync,
            Output: Serialize + Send + Sync,
            Error: Into<RpcError> + Send + Sync,
            Fut: Future<Output = Result<Output, Error>> + Send,
        {
            async fn invoke<'a>(&self, state: RpcContext, input: RawParams<'a>) -> RpcResult {
                let input = input.deserialize::<Input>()?;
                let output = (self.f)(state, input).await.map_err(Into::into)?;
                serde_json::to_value(&output).map_err(|e| RpcError::InternalError(e.into()))
            }
        }

        Arc::new(Helper {
            f: self,
            _marker: PhantomData,
        })
    }
}

/// Maps JSON-RPC method names to their handlers.
#[derive(Clone)]
pub struct RpcRouter {
    context: RpcContext,
    methods: Arc<HashMap<&'static str, Arc<dyn RpcMethodEndpoint>>>,
}

#[derive(Default)]
pub struct RpcRouterBuilder {
    methods: HashMap<&'static str, Arc<dyn RpcMethodEndpoint>>,
}

impl RpcRouterBuilder {
    pub fn register<I, O, E>(
        mut self,
        method_name: &'static str,
        method: impl IntoRpcEndpoint<I, O, E>,
    ) -> Self {
        self.methods.insert(method_name, method.into_endpoint());
        self
    }

    pub fn build(self, context: RpcContext) -> RpcRouter {
        RpcRouter {
            context,
            methods: Arc::new(self.methods),
        }
    }
}

impl RpcRouter {
    pub fn builder() -> RpcRouterBuilder {
        Default::default()
    }

    /// Parses and executes a single request.
    ///
    /// Returns [None] for notifications, which get no response.
    async fn run_request(&self, request: &str) -> Option<RpcResponse> {
        let request = match serde_json::from_str::<RpcRequest<'_>>(request) {
            Ok(request) => request,
            Err(e) => return Some(RpcResponse::invalid_request(e.to_string())),
        };

        // Ignore notification requests.
        if request.id.is_notification() {
            return None;
        }

        let Some((&method_name, method)) = self.methods.get_key_value(request.method.as_ref())
        else {
            tracing::debug!(method=%request.method, "Unknown method");
            return Some(RpcResponse::method_not_found(request.id));
        };

        metrics::increment_counter!("rpc_method_calls_total", "method" => method_name);

        let method = Arc::clone(method);
        let context = self.context.clone();
        let params = request.params.0.map(ToOwned::to_owned);

        // Use tokio spawn to handle panics. A panicking method must not take the
        // connection with it.
        let result = tokio::spawn(
            async move { method.invoke(context, RawParams(params.as_deref())).await }
                .instrument(tracing::debug_span!("rpc_method", method = method_name)),
        )
        .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(method = method_name, error = %e, "RPC method panicked");
                Err(RpcError::InternalError(anyhow::anyhow!(e)))
            }
        };

        if output.is_err() {
            metrics::increment_counter!("rpc_method_calls_failed_total", "method" => method_name);
        }

        Some(RpcResponse {
            output,
            id: request.id,
        })
    }
}

enum RpcResponses {
    Empty,
    Single(RpcResponse),
    Multiple(Vec<RpcResponse>),
}

enum RpcRequestError {
    ParseError(String),
    InvalidRequest(String),
}

/// Runs `f` over `items` with at most `limit` futures in flight, preserving
/// the input order in the output.
fn run_concurrently<I, F, Fut>(
    limit: NonZeroUsize,
    items: I,
    f: F,
) -> impl Stream<Item = Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    futures::stream::iter(items).map(f).buffered(limit.get())
}

async fn handle_json_rpc_body(
    state: &RpcRouter,
    body: &[u8],
) -> Result<RpcResponses, RpcRequestError> {
    // A single request and a batch are told apart by their first non-whitespace
    // byte since borrowed raw values can't be used in an untagged enum.
    let is_batch = body
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[');

    if !is_batch {
        let request = serde_json::from_slice::<&RawValue>(body)
            .map_err(|e| RpcRequestError::ParseError(e.to_string()))?;

        match state.run_request(request.get()).await {
            Some(response) => Ok(RpcResponses::Single(response)),
            None => Ok(RpcResponses::Empty),
        }
    } else {
        let requests = serde_json::from_slice::<Vec<&RawValue>>(body)
            .map_err(|e| RpcRequestError::ParseError(e.to_string()))?;

        if requests.is_empty() {
            return Err(RpcRequestError::InvalidRequest(
                "A batch request must contain at least one request".to_owned(),
            ));
        }

        // Owned items keep the batch future free of borrowed lifetimes, which
        // axum's handler bounds require.
        let requests = requests
            .into_iter()
            .map(RawValue::get)
            .map(str::to_owned)
            .enumerate();

        let responses = run_concurrently(
            state.context.config.batch_concurrency_limit,
            requests,
            |(idx, request)| {
                let router = state.clone();
                async move { router.run_request(&request).await }
                    .instrument(tracing::debug_span!("batch", idx))
            },
        )
        .filter_map(futures::future::ready)
        .collect::<Vec<RpcResponse>>()
        .await;

        // All requests were notifications.
        if responses.is_empty() {
            return Ok(RpcResponses::Empty);
        }

        Ok(RpcResponses::Multiple(responses))
    }
}

/// An axum handler for a JSON-RPC endpoint served by an [RpcRouter].
///
/// ```ignore
/// let router = axum::Router::new()
///     .route("/", post(rpc_handler))
///     .with_state(rpc_router);
/// ```
pub async fn rpc_handler(
    State(state): State<RpcRouter>,
    headers: http::HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    // Only allow json content.
    let is_json = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return http::StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    match handle_json_rpc_body(&state, &body).await {
        Ok(RpcResponses::Empty) => ().into_response(),
        Ok(RpcResponses::Single(response)) => response.into_response(),
        Ok(RpcResponses::Multiple(responses)) => {
            responses.iter().for_each(RpcResponse::log_internal_error);
            json_response(&responses)
        }
        Err(RpcRequestError::ParseError(e)) => RpcResponse::parse_error(e).into_response(),
        Err(RpcRequestError::InvalidRequest(e)) => RpcResponse::invalid_request(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions_sorted::assert_eq;
    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::*;
    use crate::error::ApplicationError;

    async fn spawn_server(router: RpcRouter) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        tokio::spawn(async move {
            let router = axum::Router::new()
                .route("/", axum::routing::post(rpc_handler))
                .with_state(router);
            axum::serve(listener, router.into_make_service()).await
        });

        url
    }

    #[derive(Debug, Deserialize)]
    struct SubtractInput {
        minuend: i32,
        subtrahend: i32,
    }

    async fn subtract(_: RpcContext, input: SubtractInput) -> Result<i32, ApplicationError> {
        Ok(input.minuend - input.subtrahend)
    }

    #[derive(Debug, Deserialize)]
    struct SumInput(Vec<i32>);

    async fn sum(_: RpcContext, input: SumInput) -> Result<i32, ApplicationError> {
        Ok(input.0.iter().sum())
    }

    #[derive(Debug, Deserialize)]
    struct NoInput {}

    async fn fail(_: RpcContext, _: NoInput) -> Result<Value, ApplicationError> {
        Err(ApplicationError::ContractNotFound)
    }

    async fn panic(_: RpcContext, _: NoInput) -> Result<Value, ApplicationError> {
        panic!("Oh no!");
    }

    fn router() -> RpcRouter {
        RpcRouter::builder()
            .register("subtract", subtract)
            .register("sum", sum)
            .register("fail", fail)
            .register("panic", panic)
            .build(RpcContext::for_tests())
    }

    async fn post(url: &str, body: Value) -> Value {
        reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap()
    }

    mod jsonrpc_examples {
        //! Test cases lifted directly from the [RPC specification](https://www.jsonrpc.org/specification).
        use pretty_assertions_sorted::assert_eq;

        use super::*;

        #[tokio::test]
        async fn with_positional_params() {
            let url = spawn_server(router()).await;

            let res = post(
                &url,
                json!({"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": 2}),
            )
            .await;
            assert_eq!(res, json!({"jsonrpc": "2.0", "result": 19, "id": 2}));

            let res = post(
                &url,
                json!({"jsonrpc": "2.0", "method": "subtract", "params": [23, 42], "id": 2}),
            )
            .await;
            assert_eq!(res, json!({"jsonrpc": "2.0", "result": -19, "id": 2}));
        }

        #[tokio::test]
        async fn with_named_params() {
            let url = spawn_server(router()).await;

            let res = post(
                &url,
                json!({"jsonrpc": "2.0", "method": "subtract", "params": {"subtrahend": 23, "minuend": 42}, "id": 3}),
            )
            .await;
            assert_eq!(res, json!({"jsonrpc": "2.0", "result": 19, "id": 3}));
        }

        #[tokio::test]
        async fn notification() {
            let url = spawn_server(router()).await;

            let res = reqwest::Client::new()
                .post(&url)
                .json(&json!({"jsonrpc": "2.0", "method": "sum", "params": [1, 2]}))
                .send()
                .await
                .unwrap();

            assert_eq!(res.status(), http::StatusCode::OK);
            assert!(res.text().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn non_existent_method() {
            let url = spawn_server(router()).await;

            let res = post(&url, json!({"jsonrpc": "2.0", "method": "foobar", "id": "1"})).await;

            assert_eq!(
                res,
                json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found"}, "id": "1"})
            );
        }

        #[tokio::test]
        async fn invalid_json() {
            let url = spawn_server(router()).await;

            let res = reqwest::Client::new()
                .post(&url)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"jsonrpc": "2.0", "method": "foobar, "params": "bar", "baz]"#)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap();

            assert_eq!(res["error"]["code"], json!(-32700));
            assert_eq!(res["id"], Value::Null);
        }

        #[tokio::test]
        async fn invalid_request_object() {
            let url = spawn_server(router()).await;

            let res = post(&url, json!({"jsonrpc": "2.0", "method": 1, "params": "bar"})).await;

            assert_eq!(res["error"]["code"], json!(-32600));
            assert_eq!(res["id"], Value::Null);
        }

        #[tokio::test]
        async fn empty_batch() {
            let url = spawn_server(router()).await;

            let res = post(&url, json!([])).await;

            assert_eq!(res["error"]["code"], json!(-32600));
        }

        #[tokio::test]
        async fn invalid_batch() {
            let url = spawn_server(router()).await;

            let res = post(&url, json!([1, 2])).await;

            let expected_codes = json!([-32600, -32600]);
            let codes = res
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r["error"]["code"].clone())
                .collect::<Vec<_>>();
            assert_eq!(Value::Array(codes), expected_codes);
        }

        #[tokio::test]
        async fn batch() {
            let url = spawn_server(router()).await;

            let res = post(
                &url,
                json!([
                    {"jsonrpc": "2.0", "method": "sum", "params": [1,2,4], "id": "1"},
                    {"jsonrpc": "2.0", "method": "sum", "params": [7]},
                    {"jsonrpc": "2.0", "method": "subtract", "params": [42,23], "id": "2"},
                    {"foo": "boo"},
                    {"jsonrpc": "2.0", "method": "foo.get", "params": {"name": "myself"}, "id": "5"},
                ]),
            )
            .await;

            let res = res.as_array().unwrap();
            assert_eq!(res.len(), 4);
            assert_eq!(res[0], json!({"jsonrpc": "2.0", "result": 7, "id": "1"}));
            assert_eq!(res[1], json!({"jsonrpc": "2.0", "result": 19, "id": "2"}));
            assert_eq!(res[2]["error"]["code"], json!(-32600));
            assert_eq!(res[3]["error"]["code"], json!(-32601));
        }

        #[tokio::test]
        async fn batch_all_notifications() {
            let url = spawn_server(router()).await;

            let res = reqwest::Client::new()
                .post(&url)
                .json(&json!([
                    {"jsonrpc": "2.0", "method": "sum", "params": [1,2,4]},
                    {"jsonrpc": "2.0", "method": "sum", "params": [7]},
                ]))
                .send()
                .await
                .unwrap();

            assert_eq!(res.status(), http::StatusCode::OK);
            assert!(res.text().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn application_error() {
        let url = spawn_server(router()).await;

        let res = post(&url, json!({"jsonrpc": "2.0", "method": "fail", "params": {}, "id": 1})).await;

        assert_eq!(
            res,
            json!({"jsonrpc": "2.0", "error": {"code": 20, "message": "Contract not found"}, "id": 1})
        );
    }

    #[tokio::test]
    async fn invalid_params() {
        let url = spawn_server(router()).await;

        let res = post(
            &url,
            json!({"jsonrpc": "2.0", "method": "subtract", "params": {"minuend": "42"}, "id": 1}),
        )
        .await;

        assert_eq!(res["error"]["code"], json!(-32602));
    }

    #[tokio::test]
    async fn panic_is_internal_error() {
        let url = spawn_server(router()).await;

        let res = post(&url, json!({"jsonrpc": "2.0", "method": "panic", "params": {}, "id": 1})).await;
        assert_eq!(
            res,
            json!({"jsonrpc": "2.0", "error": {"code": -32603, "message": "Internal error"}, "id": 1})
        );

        // The server keeps serving after the panic.
        let res = post(&url, json!({"jsonrpc": "2.0", "method": "sum", "params": [1], "id": 2})).await;
        assert_eq!(res, json!({"jsonrpc": "2.0", "result": 1, "id": 2}));
    }

    #[tokio::test]
    async fn rejects_non_json_content() {
        let url = spawn_server(router()).await;

        let res = reqwest::Client::new()
            .post(&url)
            .header(http::header::CONTENT_TYPE, "text/plain")
            .body(r#"{"jsonrpc": "2.0", "method": "sum", "params": [1], "id": 2}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn batch_respects_concurrency_limit() {
        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static MAX_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

        async fn slow(_: RpcContext, _: NoInput) -> Result<(), ApplicationError> {
            let current = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
            MAX_IN_FLIGHT.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        let mut context = RpcContext::for_tests();
        context.config.batch_concurrency_limit = NonZeroUsize::new(2).unwrap();
        let router = RpcRouter::builder().register("slow", slow).build(context);
        let url = spawn_server(router).await;

        let batch = (0..6)
            .map(|id| json!({"jsonrpc": "2.0", "method": "slow", "params": {}, "id": id}))
            .collect::<Vec<_>>();
        let res = post(&url, Value::Array(batch)).await;

        let ids = res
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, (0..6).map(|id| json!(id)).collect::<Vec<_>>());
        assert!(MAX_IN_FLIGHT.load(Ordering::SeqCst) <= 2);
    }
}
