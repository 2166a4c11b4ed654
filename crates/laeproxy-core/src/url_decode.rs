//! Reconstructs `scheme://host/tail` out of the proxy-encoded path
//! `/<scheme>/<host>[/<rest>]`, rejecting malformed, empty-host, or
//! self-addressed (recursive) requests before anything is forwarded.

use percent_encoding::percent_decode_str;

use crate::error::ProxyError;

/// The decoded target of a proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub scheme: String,
    pub host: String,
    pub tail: String,
}

impl TargetUrl {
    /// The fully reconstructed `scheme://host/tail` target, suitable for `Fetch`.
    pub fn as_url(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.host, self.tail)
    }
}

/// Parses `path_and_query` (with or without a leading `/`) into a [`TargetUrl`],
/// rejecting a request whose decoded host matches `own_authority` (case-insensitive)
/// to prevent the proxy from looping back on itself.
pub fn decode_target(path_and_query: &str, own_authority: &str) -> Result<TargetUrl, ProxyError> {
    let path = path_and_query.strip_prefix('/').unwrap_or(path_and_query);

    let (scheme, rest1) = path.split_once('/').ok_or(ProxyError::InvalidUrl)?;

    let (host_enc, tail) = match rest1.split_once('/') {
        Some((h, t)) => (h, t),
        None => (rest1, ""),
    };

    let host = percent_decode_str(host_enc)
        .decode_utf8()
        .map_err(|_| ProxyError::InvalidUrl)?
        .into_owned();

    if host.is_empty() {
        return Err(ProxyError::MissingHost);
    }

    if host.eq_ignore_ascii_case(own_authority) {
        return Err(ProxyError::RecursiveRequest);
    }

    Ok(TargetUrl {
        scheme: scheme.to_string(),
        host,
        tail: tail.to_string(),
    })
}
