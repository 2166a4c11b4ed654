//! Numeric quotas, the hop-by-hop header set, and the production/development switch.
//!
//! Reference values mirror the historical App Engine quotas this proxy was built against:
//! <http://code.google.com/appengine/docs/python/urlfetch/overview.html#Quotas_and_Limits>

use std::time::Duration;

/// Methods the proxy will dispatch. Anything else is rejected by the HTTP server
/// before it reaches the core.
pub const METHODS: &[http::Method] = &[
    http::Method::DELETE,
    http::Method::GET,
    http::Method::HEAD,
    http::Method::PUT,
    http::Method::POST,
];

/// Methods that always carry (and require) a `Range` header.
pub fn is_range_method(method: &http::Method) -> bool {
    *method == http::Method::GET
}

/// Methods whose body is forwarded as the outbound payload.
pub fn is_payload_method(method: &http::Method) -> bool {
    *method == http::Method::PUT || *method == http::Method::POST
}

/// Hop-by-hop headers per RFC 2616 §13.5.1, never forwarded in either direction.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Distinguishes a production deployment from a development one. Affects only
/// logging verbosity, never protocol semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn is_dev(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

/// Per-process configuration: the platform quotas plus the environment switch.
///
/// Defaults mirror the original GAE deployment's limits; the test harness overrides
/// `range_req_size` and `urlfetch_res_maxbytes` down to small values so the
/// truncation and oversize-range scenarios don't need to move megabytes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Max bytes in a PUT/POST body before we refuse to even attempt a fetch.
    pub urlfetch_req_maxbytes: u64,
    /// Max bytes we'll accept back from the origin before treating the fetch as truncated.
    pub urlfetch_res_maxbytes: u64,
    /// Deadline on the single outbound fetch.
    pub urlfetch_req_maxsecs: Duration,
    /// Deadline on the whole request, fetch included.
    pub gae_req_maxsecs: Duration,
    /// Cap on the byte length of an accepted GET Range.
    pub range_req_size: u64,
    /// Max outbound fetches the `Fetcher` will have in flight at once. The
    /// original platform metered urlfetch calls against a shared daily/per-minute
    /// budget; a single proxy instance has no such external throttle to observe,
    /// so this bounds the analogous resource locally instead.
    pub max_concurrent_fetches: usize,
    pub environment: Environment,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            urlfetch_req_maxbytes: 1024 * 1024 * 5,
            urlfetch_res_maxbytes: 1024 * 1024 * 32,
            urlfetch_req_maxsecs: Duration::from_secs(60),
            gae_req_maxsecs: Duration::from_secs(60),
            range_req_size: 2_000_000,
            max_concurrent_fetches: 50,
            environment: Environment::Development,
        }
    }
}
