//! Hop-by-hop header stripping (request and response) plus the relative
//! `Location` fixup carried over from `laeproxy`'s issue #14.

use std::collections::HashSet;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::HOP_BY_HOP;
use crate::url_decode::TargetUrl;

/// Builds the per-message strip set: the constant [`HOP_BY_HOP`] set, unioned with
/// whatever header names the message's own `Connection` header lists.
fn strip_set(headers: &HeaderMap) -> HashSet<String> {
    let mut set: HashSet<String> = HOP_BY_HOP.iter().map(|s| s.to_string()).collect();
    if let Some(connection) = headers.get(http::header::CONNECTION) {
        if let Ok(value) = connection.to_str() {
            for name in value.split(',') {
                let name = name.trim().to_ascii_lowercase();
                if !name.is_empty() {
                    set.insert(name);
                }
            }
        }
    }
    set
}

/// Removes hop-by-hop headers (RFC 2616 §13.5.1, extended by the message's own
/// `Connection` header) and `Host`, comparing names case-insensitively. Sanitizing
/// an already-sanitized map is the identity.
pub fn sanitize_request(headers: &mut HeaderMap) {
    let mut strip = strip_set(headers);
    strip.insert("host".to_string());
    remove_matching(headers, &strip);
}

/// Removes hop-by-hop headers (RFC 2616 §13.5.1, extended by the response's own
/// `Connection` header) from a fetched response before it's relayed to the client.
pub fn sanitize_response(headers: &mut HeaderMap) {
    let strip = strip_set(headers);
    remove_matching(headers, &strip);
}

fn remove_matching(headers: &mut HeaderMap, names: &HashSet<String>) {
    for name in names {
        if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
            headers.remove(header_name);
        }
    }
}

/// If the origin's `Location` header isn't already absolute, rewrites it against
/// `target`'s scheme and host so a redirect surfaced verbatim to the client still
/// carries a usable absolute URL. Carried over from `original_source/laeproxy.py`
/// (issue #14); this is a correctness fix, not a new feature.
pub fn fixup_relative_location(headers: &mut HeaderMap, target: &TargetUrl) {
    let Some(location) = headers.get(http::header::LOCATION) else {
        return;
    };
    let Ok(location) = location.to_str() else {
        return;
    };
    if location.starts_with("http") {
        return;
    }

    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        format!("/{location}")
    };
    let absolute = format!("{}://{}{}", target.scheme, target.host, path);

    if let Ok(value) = HeaderValue::from_str(&absolute) {
        headers.insert(http::header::LOCATION, value);
    }
}
