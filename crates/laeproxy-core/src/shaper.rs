//! Decides whether to pass an upstream response through unmodified, flag it as
//! truncated, or validate a 206's `Content-Range` against the requested range.

use http::{HeaderValue, StatusCode};

use crate::fetch::FetchResult;
use crate::range::RangeSpec;

/// The subset of the upstream response the Result Annotator needs, computed once
/// by the shaper so annotation stays a pure header-stamping step.
#[derive(Debug, Clone)]
pub struct ShapedResponse {
    pub status: StatusCode,
    pub upstream_server: String,
    pub upstream_status: StatusCode,
    pub upstream_content_range: Option<String>,
    pub truncated: bool,
}

/// Shapes a completed fetch. `range` is `Some` iff the request was a GET that
/// carried a validated range (i.e. reached `Fetch` at all).
pub fn shape(fetched: &FetchResult, range: Option<RangeSpec>) -> ShapedResponse {
    let upstream_server = fetched
        .headers
        .get(http::header::SERVER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut shaped = ShapedResponse {
        status: fetched.status,
        upstream_server,
        upstream_status: fetched.status,
        upstream_content_range: None,
        truncated: fetched.truncated,
    };

    if fetched.truncated {
        tracing::warn!("urlfetch returned truncated response, returning as-is, originator should verify");
        return shaped;
    }

    let Some(range) = range else {
        tracing::debug!("non-range method, returning response as-is");
        return shaped;
    };

    if fetched.status == StatusCode::OK {
        tracing::debug!("destination server does not support range requests, returning response as-is");
        return shaped;
    }

    if fetched.status == StatusCode::PARTIAL_CONTENT {
        let crange = content_range_header(&fetched.headers);
        shaped.upstream_content_range = crange.clone();

        let Some(crange) = crange else {
            return shaped;
        };

        match parse_content_range(&crange) {
            Some((start, end, total)) => {
                let _entire = start == 0 && end == total.saturating_sub(1);
                if start == range.start && end <= range.end {
                    tracing::debug!("upstream 206 fulfills the requested range, returning as-is");
                } else {
                    tracing::warn!(
                        "upstream Content-Range {:?} does not match requested range {:?}, returning as-is",
                        crange,
                        range
                    );
                }
            }
            None => {
                tracing::warn!("error parsing upstream Content-Range {:?}, returning 206 as-is", crange);
            }
        }
        return shaped;
    }

    tracing::debug!("non-200/206 response to range request, returning response as-is");
    shaped
}

fn content_range_header(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(http::header::CONTENT_RANGE)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Strictly parses `bytes S-E/T` into `(S, E, T)`. Anything else is a parse failure.
fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let rest = value.strip_prefix("bytes ")?;
    let (sent, total) = rest.split_once('/')?;
    let (start, end) = sent.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = end.parse().ok()?;
    let total: u64 = total.parse().ok()?;
    Some((start, end, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderMap;

    fn fetched(status: StatusCode, headers: HeaderMap, truncated: bool) -> FetchResult {
        FetchResult {
            status,
            headers,
            body: Bytes::new(),
            truncated,
        }
    }

    #[test]
    fn truncated_short_circuits_everything() {
        let shaped = shape(&fetched(StatusCode::OK, HeaderMap::new(), true), Some(RangeSpec { start: 0, end: 10 }));
        assert!(shaped.truncated);
    }

    #[test]
    fn non_range_method_passes_through() {
        let shaped = shape(&fetched(StatusCode::OK, HeaderMap::new(), false), None);
        assert_eq!(shaped.status, StatusCode::OK);
        assert!(shaped.upstream_content_range.is_none());
    }

    #[test]
    fn status_200_to_range_request_passes_through_unmodified() {
        let shaped = shape(
            &fetched(StatusCode::OK, HeaderMap::new(), false),
            Some(RangeSpec { start: 0, end: 10 }),
        );
        assert_eq!(shaped.status, StatusCode::OK);
    }

    #[test]
    fn status_206_records_and_validates_content_range() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_RANGE, HeaderValue::from_static("bytes 0-10/100"));
        let shaped = shape(
            &fetched(StatusCode::PARTIAL_CONTENT, headers, false),
            Some(RangeSpec { start: 0, end: 10 }),
        );
        assert_eq!(shaped.upstream_content_range.as_deref(), Some("bytes 0-10/100"));
    }

    #[test]
    fn status_206_with_malformed_content_range_still_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_RANGE, HeaderValue::from_static("garbage"));
        let shaped = shape(
            &fetched(StatusCode::PARTIAL_CONTENT, headers, false),
            Some(RangeSpec { start: 0, end: 10 }),
        );
        assert_eq!(shaped.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(shaped.upstream_content_range.as_deref(), Some("garbage"));
    }

    #[test]
    fn status_206_not_fulfilling_range_still_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_RANGE, HeaderValue::from_static("bytes 5-10/100"));
        let shaped = shape(
            &fetched(StatusCode::PARTIAL_CONTENT, headers, false),
            Some(RangeSpec { start: 0, end: 10 }),
        );
        assert_eq!(shaped.status, StatusCode::PARTIAL_CONTENT);
    }
}
