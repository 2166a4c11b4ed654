//! Per-request relay engine for `laeproxy`: URL reconstruction, hop-by-hop header
//! hygiene, Range admission, the outbound fetch invocation, response shaping, and
//! the result-annotation protocol. The HTTP server, the concrete `Fetch`
//! primitive's wiring, and process supervision live in the `laeproxy` binary
//! crate; this crate is the stateless core they call into.

pub mod annotate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod range;
pub mod shaper;
pub mod url_decode;

pub use config::Config;
pub use dispatch::{dispatch, IncomingRequest, OutgoingResponse};
pub use error::ProxyError;
pub use fetch::{FetchRequest, FetchResult, Fetcher, ReqwestFetcher};
