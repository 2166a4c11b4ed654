//! The closed error taxonomy, each variant carrying its own status code and
//! `X-laeproxy-result` string so the dispatcher and the result annotator share
//! one source of truth.

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid url")]
    InvalidUrl,

    #[error("Missing host")]
    MissingHost,

    #[error("Ignored recursive request")]
    RecursiveRequest,

    #[error("Request size exceeds urlfetch limit")]
    PayloadTooLarge,

    #[error("Missing or invalid range header")]
    RangeMissingOrInvalid,

    #[error("Multiple ranges unsupported")]
    RangeMultiple,

    #[error("Range must be of the form bytes=x-y")]
    RangeNotClosed,

    #[error("Range must satisfy 0 <= range_start <= range_end")]
    RangeOutOfOrder,

    #[error("Range specifies {requested} bytes, limit is {limit}")]
    RangeTooLarge { requested: u64, limit: u64 },

    #[error("Missed urlfetch deadline")]
    FetchDeadline,

    #[error("Exceeded urlfetch quota")]
    FetchQuotaExceeded,

    #[error("Unexpected error: {0}")]
    FetchUnexpected(String),
}

impl ProxyError {
    /// The status code this error is surfaced to the client as.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUrl => StatusCode::NOT_FOUND,
            ProxyError::MissingHost => StatusCode::NOT_FOUND,
            ProxyError::RecursiveRequest => StatusCode::NOT_FOUND,
            ProxyError::PayloadTooLarge => StatusCode::BAD_REQUEST,
            ProxyError::RangeMissingOrInvalid => StatusCode::BAD_REQUEST,
            ProxyError::RangeMultiple => StatusCode::BAD_REQUEST,
            ProxyError::RangeNotClosed => StatusCode::BAD_REQUEST,
            ProxyError::RangeOutOfOrder => StatusCode::RANGE_NOT_SATISFIABLE,
            ProxyError::RangeTooLarge { .. } => StatusCode::BAD_REQUEST,
            ProxyError::FetchDeadline => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::FetchQuotaExceeded => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::FetchUnexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The verbatim `X-laeproxy-result` string for this error.
    pub fn result_string(&self) -> String {
        self.to_string()
    }
}
