//! The transport seam between the client and the network.
//!
//! # Design
//! `ApiClient` never performs I/O itself; it hands a fully-built
//! `HttpRequest` to a `Transport` and classifies whatever comes back. A
//! transport must:
//!
//! - return statuses in `ACCEPTED_STATUSES` (200–503) as data,
//! - fail with `TransportError::Status` for any other status,
//! - fail with `TransportError::Timeout` once `request.timeout_ms` elapses,
//! - never retry.
//!
//! `ReqwestTransport` is the default implementation. Tests plug in stubs.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse, ACCEPTED_STATUSES};

    /// `Transport` backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        http: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured client (proxies, TLS roots, ...).
        pub fn with_http_client(http: reqwest::Client) -> Self {
            Self { http }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Put => reqwest::Method::PUT,
            };

            let mut builder = self
                .http
                .request(method, &request.url)
                .timeout(Duration::from_millis(request.timeout_ms));
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (key, value) in &request.headers {
                builder = builder.header(key, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(request.timeout_ms)
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

            let status = resp.status().as_u16();
            if !ACCEPTED_STATUSES.contains(&status) {
                return Err(TransportError::Status(status));
            }

            let headers = resp
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
                .collect();
            let body = resp.text().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(request.timeout_ms)
                } else {
                    TransportError::Network(format!("failed to read body: {e}"))
                }
            })?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}
