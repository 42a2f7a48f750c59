//! Middleware for modifying requests and responses.

use http::Request;
use tower_http::trace::MakeSpan;

static X_REQUEST_ID: &str = "x-request-id";

/// Creates a request span tagged with the id set by the request-id layer.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MakeRequestIdSpan;

impl<B> MakeSpan<B> for MakeRequestIdSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|id| id.to_str().ok())
            .unwrap_or("unknown");
        tracing::info_span!(
            "request",
            request_id = request_id,
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
        )
    }
}
