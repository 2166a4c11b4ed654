//! Stamps the fixed set of diagnostic headers onto every outgoing response.
//! Annotation headers are applied last so they win over any forwarded header of
//! the same name.

use chrono::Utc;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::shaper::ShapedResponse;

pub const H_VERSION: HeaderName = HeaderName::from_static("x-laeproxy-version");
pub const H_RESULT: HeaderName = HeaderName::from_static("x-laeproxy-result");
pub const H_UPSTREAM_SERVER: HeaderName = HeaderName::from_static("x-laeproxy-upstream-server");
pub const H_UPSTREAM_STATUS_CODE: HeaderName =
    HeaderName::from_static("x-laeproxy-upstream-status-code");
pub const H_UPSTREAM_CONTENT_RANGE: HeaderName =
    HeaderName::from_static("x-laeproxy-upstream-content-range");
pub const H_TRUNCATED: HeaderName = HeaderName::from_static("x-laeproxy-truncated");

pub const VERSION: &str = "0.7.1";

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}

/// Annotates a response that never reached `Fetch` with the version header and a
/// single result string.
pub fn annotate_short_circuit(headers: &mut HeaderMap, result: &str) {
    insert(headers, H_VERSION, VERSION);
    insert(headers, H_RESULT, result);
}

/// Annotates a response built from a completed fetch: version, the
/// "Retrieved from network <timestamp>" result string, upstream-server,
/// upstream-status-code, and (when applicable) upstream-content-range and the
/// truncation flag.
pub fn annotate_fetched(headers: &mut HeaderMap, shaped: &ShapedResponse) {
    insert(headers, H_VERSION, VERSION);
    insert(
        headers,
        H_RESULT,
        &format!("Retrieved from network {}", Utc::now().to_rfc3339()),
    );
    insert(headers, H_UPSTREAM_SERVER, &shaped.upstream_server);
    insert(
        headers,
        H_UPSTREAM_STATUS_CODE,
        shaped.upstream_status.as_str(),
    );
    if let Some(crange) = &shaped.upstream_content_range {
        insert(headers, H_UPSTREAM_CONTENT_RANGE, crange);
    }
    if shaped.truncated {
        insert(headers, H_TRUNCATED, "true");
    }
}

/// Appends " Missed GAE deadline" to whatever result string is currently set,
/// preserving prior context about how far processing got, and ensures the
/// version header is present.
pub fn annotate_deadline_expired(headers: &mut HeaderMap, prior_result: &str) {
    insert(headers, H_VERSION, VERSION);
    insert(headers, H_RESULT, &format!("{prior_result} Missed GAE deadline"));
}
