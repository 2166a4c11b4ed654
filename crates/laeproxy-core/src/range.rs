//! Admission and normalization of the single closed byte range every GET must carry.

use crate::error::ProxyError;

/// A validated, closed, end-inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
}

impl RangeSpec {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The outbound `Range: bytes=X-Y` header value.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Parses and validates the incoming `Range` header value against `range_req_size`.
///
/// Accepts only a single closed range of the form `bytes=X-Y`. Suffix (`bytes=-N`)
/// and open-ended (`bytes=X-`) forms, multiple ranges, and anything unparseable are
/// rejected, matching the table in the component design.
pub fn parse_range(header_value: Option<&str>, range_req_size: u64) -> Result<RangeSpec, ProxyError> {
    let value = header_value.ok_or(ProxyError::RangeMissingOrInvalid)?;
    let spec = value
        .strip_prefix("bytes=")
        .ok_or(ProxyError::RangeMissingOrInvalid)?;

    if spec.contains(',') {
        return Err(ProxyError::RangeMultiple);
    }

    let (start_str, end_str) = spec.split_once('-').ok_or(ProxyError::RangeMissingOrInvalid)?;

    if start_str.is_empty() || end_str.is_empty() {
        // suffix form (`-N`) or open-ended form (`X-`)
        return Err(ProxyError::RangeNotClosed);
    }

    let start: u64 = start_str.parse().map_err(|_| ProxyError::RangeMissingOrInvalid)?;
    let end: u64 = end_str.parse().map_err(|_| ProxyError::RangeMissingOrInvalid)?;

    if start > end {
        return Err(ProxyError::RangeOutOfOrder);
    }

    let len = end - start + 1;
    if len > range_req_size {
        return Err(ProxyError::RangeTooLarge {
            requested: len,
            limit: range_req_size,
        });
    }

    Ok(RangeSpec { start, end })
}
