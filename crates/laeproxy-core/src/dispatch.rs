//! Method dispatch and the overall-deadline guard wrapping the whole pipeline:
//! URL Decoder → (payload size check) → Header Sanitizer → (Range Policy) →
//! Fetch Invoker → Response Shaper → Result Annotator.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::annotate;
use crate::config::{is_payload_method, is_range_method, Config};
use crate::error::ProxyError;
use crate::fetch::{Fetcher, FetchRequest};
use crate::headers::{fixup_relative_location, sanitize_request, sanitize_response};
use crate::range::parse_range;
use crate::shaper::shape;
use crate::url_decode::decode_target;

/// Everything the dispatcher needs about one incoming request. Built by the HTTP
/// server; read-only for the core.
pub struct IncomingRequest {
    pub method: Method,
    pub path_and_query: String,
    pub own_authority: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully-built outgoing response, ready for the HTTP server to serialize.
pub struct OutgoingResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Tracks the furthest result string the pipeline reached, so the deadline guard
/// can compose onto it even if the pipeline's own future was cancelled mid-flight.
/// Only the "retrieved from network" checkpoint (set right after a successful
/// fetch) is recorded; everything before that point is represented by the empty
/// string, matching the original handler's `resheaders.get(H_LAEPROXY_RESULT, '')`.
type ProgressSlot = Arc<Mutex<String>>;

/// Runs the full pipeline under the `gae_req_maxsecs` deadline. Every exit path —
/// success, a recovered `ProxyError`, or a timeout — produces a fully annotated
/// [`OutgoingResponse`]; none discard the annotation work done by earlier stages.
pub async fn dispatch(
    req: IncomingRequest,
    config: &Config,
    fetcher: &dyn Fetcher,
) -> OutgoingResponse {
    let progress: ProgressSlot = Arc::new(Mutex::new(String::new()));

    match tokio::time::timeout(config.gae_req_maxsecs, run_pipeline(req, config, fetcher, progress.clone())).await {
        Ok(response) => response,
        Err(_elapsed) => {
            tracing::warn!("overall request deadline exceeded");
            let prior = progress.lock().unwrap().clone();
            let mut headers = HeaderMap::new();
            annotate::annotate_deadline_expired(&mut headers, &prior);
            OutgoingResponse {
                status: StatusCode::GATEWAY_TIMEOUT,
                headers,
                body: Bytes::new(),
            }
        }
    }
}

async fn run_pipeline(
    req: IncomingRequest,
    config: &Config,
    fetcher: &dyn Fetcher,
    progress: ProgressSlot,
) -> OutgoingResponse {
    let range_method = is_range_method(&req.method);
    let payload_method = is_payload_method(&req.method);

    let target = match decode_target(&req.path_and_query, &req.own_authority) {
        Ok(t) => t,
        Err(e) => return short_circuit(e),
    };

    let payload = if payload_method { req.body.clone() } else { Bytes::new() };
    if payload.len() as u64 >= config.urlfetch_req_maxbytes {
        return short_circuit(ProxyError::PayloadTooLarge);
    }

    let mut outbound_headers = req.headers;
    sanitize_request(&mut outbound_headers);

    let range = if range_method {
        let range_header = outbound_headers
            .get(http::header::RANGE)
            .and_then(|v| v.to_str().ok());
        match parse_range(range_header, config.range_req_size) {
            Ok(r) => {
                outbound_headers.insert(
                    http::header::RANGE,
                    http::HeaderValue::from_str(&r.header_value()).unwrap(),
                );
                Some(r)
            }
            Err(e) => return short_circuit(e),
        }
    } else {
        None
    };

    let fetch_req = FetchRequest {
        method: req.method.clone(),
        url: target.as_url(),
        headers: outbound_headers,
        body: payload,
        deadline: config.urlfetch_req_maxsecs,
    };

    let fetched = match fetcher.fetch(fetch_req).await {
        Ok(f) => f,
        Err(e) => return short_circuit(e),
    };

    *progress.lock().unwrap() = format!("Retrieved from network {}", chrono::Utc::now().to_rfc3339());

    let shaped = shape(&fetched, range);

    let mut response_headers = fetched.headers;
    fixup_relative_location(&mut response_headers, &target);
    sanitize_response(&mut response_headers);
    annotate::annotate_fetched(&mut response_headers, &shaped);

    OutgoingResponse {
        status: shaped.status,
        headers: response_headers,
        body: fetched.body,
    }
}

fn short_circuit(error: ProxyError) -> OutgoingResponse {
    let status = error.status();
    let result = error.result_string();
    tracing::debug!(%result, %status, "short-circuiting request before forwarding");
    let mut headers = HeaderMap::new();
    annotate::annotate_short_circuit(&mut headers, &result);
    OutgoingResponse {
        status,
        headers,
        body: Bytes::new(),
    }
}
