use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http::HeaderValue;
use tower_http::request_id::{MakeRequestId, RequestId};

/// Hands out `x-request-id` values from an incrementing counter.
#[derive(Clone, Default)]
pub(crate) struct RequestIdSource {
    counter: Arc<AtomicU64>,
}

impl MakeRequestId for RequestIdSource {
    fn make_request_id<B>(&mut self, _: &http::Request<B>) -> Option<RequestId> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);

        Some(RequestId::new(HeaderValue::from(id)))
    }
}
