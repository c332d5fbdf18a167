//! HTTP transport abstraction for testability

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;
use tracing::{debug, trace, warn};

use super::types::{Method, Response, TransportError, TransportRequest};

/// Default connect/read timeout for the underlying client in seconds.
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Issues GET and HEAD requests for the caching source.
///
/// Transport failures never surface as `Err`: they are reported inside the
/// returned [`Response`] so the caller always gets exactly one outcome.
/// Cancellation is handled by the caller dropping the future.
pub trait Transport: Send + Sync + 'static {
    /// Perform the request and resolve once it has fully completed.
    fn send(&self, request: TransportRequest) -> impl Future<Output = Response> + Send;
}

/// Transport built on an async reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the default client timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_CLIENT_TIMEOUT_SECS)
    }

    /// Create a transport whose client gives up after `timeout_secs`.
    ///
    /// Individual requests may set a shorter timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                TransportError::Request(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Canonical spelling for response headers.
///
/// reqwest lower-cases every header name. Validators are looked up with their
/// conventional spelling, so names are restored here: `etag` becomes `ETag`
/// and everything else is Title-Cased per dash-separated segment.
pub fn canonical_header_name(name: &str) -> String {
    if name.eq_ignore_ascii_case("etag") {
        return "ETag".to_string();
    }
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (canonical_header_name(name.as_str()), v.to_string()))
        })
        .collect()
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Response {
        let TransportRequest {
            url,
            method,
            timeout,
        } = request;
        trace!(url = %url, method = %method, "HTTP request starting");

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Head => self.client.head(&url),
        };

        let response = match builder.timeout(timeout).send().await {
            Ok(resp) => {
                debug!(
                    url = %url,
                    method = %method,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = %url,
                    method = %method,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                let error = if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Request(e.to_string())
                };
                return Response::failed(url, method, error);
            }
        };

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        if !response.status().is_success() {
            let mut failed = Response::failed(url, method, TransportError::Status(status))
                .with_status(status);
            failed.headers = headers;
            return failed;
        }

        let data = match method {
            Method::Head => None,
            Method::Get => match response.bytes().await {
                Ok(body) => Some(body),
                Err(e) => {
                    let error = if e.is_timeout() {
                        TransportError::Timeout
                    } else {
                        TransportError::Body(e.to_string())
                    };
                    return Response::failed(url, method, error).with_status(status);
                }
            },
        };

        Response::network(url, method, status, headers, data)
    }
}
