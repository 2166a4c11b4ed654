use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Router;
use laeproxy_core::{config, dispatch, Config, Fetcher, IncomingRequest};
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

/// Shared state for the life of the server process: the `Fetcher` capability and
/// the process-wide quota/environment configuration.
pub struct AppState {
    pub fetcher: Arc<dyn Fetcher>,
    pub config: Config,
}

/// Builds the `MethodRouter` for the catch-all path directly from
/// `laeproxy_core::config::METHODS`, so the HTTP layer's allowed methods can
/// never drift out of sync with the core's own method classification.
fn allowed_methods_router() -> MethodRouter<Arc<AppState>> {
    config::METHODS.iter().fold(MethodRouter::new(), |router, method| match *method {
        Method::DELETE => router.delete(proxy_handler),
        Method::GET => router.get(proxy_handler),
        Method::HEAD => router.head(proxy_handler),
        Method::PUT => router.put(proxy_handler),
        Method::POST => router.post(proxy_handler),
        _ => router,
    })
}

/// Builds the axum app: a single catch-all path matching `^/http(s)?/.*`, wired
/// to exactly the methods `config::METHODS` names; any other method gets axum's
/// default 405, layered with request/response tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/*path", allowed_methods_router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Single handler for all five allowed methods; delegates everything to
/// `laeproxy_core::dispatch`, which owns the whole per-request pipeline.
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let own_authority = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let request = IncomingRequest {
        method,
        path_and_query,
        own_authority,
        headers,
        body,
    };

    let outgoing = dispatch(request, &state.config, state.fetcher.as_ref()).await;

    let mut response = Response::builder().status(outgoing.status);
    *response.headers_mut().unwrap() = outgoing.headers;
    response
        .body(axum::body::Body::from(outgoing.body))
        .unwrap_or_else(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
