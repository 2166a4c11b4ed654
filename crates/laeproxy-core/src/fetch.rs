//! The outbound fetch invocation, modeled as an abstract `Fetcher` capability so
//! production code wires a real HTTP client and tests inject a mock.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::{HeaderMap, Method};
use tokio::sync::Semaphore;

use crate::error::ProxyError;

/// An outbound fetch request, already sanitized and range-checked by the caller.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub deadline: Duration,
}

/// The result of a completed fetch, regardless of upstream status code.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: http::StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// `true` iff the origin's response exceeded the platform inbound ceiling and
    /// was cut short.
    pub truncated: bool,
}

/// The abstract outbound-fetch capability. A single async method with the
/// documented failure kinds as a closed `ProxyError` variant; trait is
/// `Send + Sync` and object-safe so it can live behind a `dyn` in shared state.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResult, ProxyError>;
}

/// Production [`Fetcher`] backed by a `reqwest::Client` with redirects disabled,
/// certificate validation at its secure default, and no automatic decompression
/// (so `Content-Length` on the relayed response stays meaningful). Bounds its own
/// in-flight fetch count with a semaphore, the local analogue of the platform's
/// urlfetch quota.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    res_maxbytes: u64,
    concurrency: Arc<Semaphore>,
}

impl ReqwestFetcher {
    pub fn new(res_maxbytes: u64, max_concurrent_fetches: usize) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building the reqwest client should never fail");
        ReqwestFetcher {
            client,
            res_maxbytes,
            concurrency: Arc::new(Semaphore::new(max_concurrent_fetches)),
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResult, ProxyError> {
        let _permit = self
            .concurrency
            .try_acquire()
            .map_err(|_| ProxyError::FetchQuotaExceeded)?;

        let url = reqwest::Url::parse(&req.url).map_err(|_| ProxyError::InvalidUrl)?;

        let mut builder = self
            .client
            .request(req.method, url)
            .headers(req.headers)
            .timeout(req.deadline);
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(ProxyError::FetchDeadline),
            Err(e) if e.is_builder() => return Err(ProxyError::InvalidUrl),
            Err(e) => return Err(ProxyError::FetchUnexpected(e.to_string())),
        };

        let status = response.status();
        let mut headers = response.headers().clone();

        // Stream the body in rather than buffering it whole first, so a
        // multi-gigabyte origin response never costs more memory than res_maxbytes.
        let mut buf = BytesMut::new();
        let mut truncated = false;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProxyError::FetchUnexpected(e.to_string()))?;
            let room = self.res_maxbytes.saturating_sub(buf.len() as u64) as usize;
            if chunk.len() > room {
                buf.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        let body = buf.freeze();

        if truncated {
            // Forwarding the origin's pre-truncation Content-Length alongside a
            // shorter body would violate HTTP/1.1 framing.
            headers.insert(
                http::header::CONTENT_LENGTH,
                http::HeaderValue::from_str(&body.len().to_string()).unwrap(),
            );
        }

        Ok(FetchResult {
            status,
            headers,
            body,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn base_req(url: String) -> FetchRequest {
        FetchRequest {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            deadline: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn malformed_url_is_invalid_url_without_connecting() {
        let fetcher = ReqwestFetcher::new(1024, 10);
        let err = fetcher.fetch(base_req("not a url".to_string())).await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidUrl));
    }

    #[tokio::test]
    async fn second_fetch_over_the_concurrency_cap_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                // Accept and never respond, so the one permitted fetch stays in flight.
                std::mem::forget(socket);
            }
        });

        let fetcher = Arc::new(ReqwestFetcher::new(1024, 1));
        let mut slow_req = base_req(format!("http://{addr}/"));
        slow_req.deadline = Duration::from_secs(5);

        let first = tokio::spawn({
            let fetcher = fetcher.clone();
            let req = slow_req.clone();
            async move { fetcher.fetch(req).await }
        });
        // Give the first fetch a moment to acquire its permit before the second tries.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = fetcher.fetch(base_req(format!("http://{addr}/"))).await;
        assert!(matches!(second, Err(ProxyError::FetchQuotaExceeded)));

        first.abort();
    }

    #[tokio::test]
    async fn hanging_origin_maps_to_fetch_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            // Accept the connection and never respond.
            std::future::pending::<()>().await;
        });

        let mut req = base_req(format!("http://{addr}/"));
        req.deadline = Duration::from_millis(50);
        let fetcher = ReqwestFetcher::new(1024, 10);
        let err = fetcher.fetch(req).await.unwrap_err();
        assert!(matches!(err, ProxyError::FetchDeadline));
    }

    #[tokio::test]
    async fn garbage_response_maps_to_unexpected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = socket.write_all(b"not an http response\r\n\r\n").await;
            let _ = socket.shutdown().await;
        });

        let fetcher = ReqwestFetcher::new(1024, 10);
        let err = fetcher.fetch(base_req(format!("http://{addr}/"))).await.unwrap_err();
        assert!(matches!(err, ProxyError::FetchUnexpected(_)));
    }

    #[tokio::test]
    async fn truncation_rewrites_content_length() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let body = "x".repeat(41);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        let fetcher = ReqwestFetcher::new(16, 10);
        let result = fetcher
            .fetch(base_req(format!("http://{addr}/")))
            .await
            .unwrap();

        assert!(result.truncated);
        assert_eq!(result.body.len(), 16);
        assert_eq!(result.headers.get(http::header::CONTENT_LENGTH).unwrap(), "16");
    }
}
