//! Request and response types shared by transports and the caching source.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cache::CacheItem;

/// Header carrying the entity tag validator.
pub const ETAG_HEADER: &str = "ETag";

/// Header carrying the modification timestamp validator.
pub const LAST_MODIFIED_HEADER: &str = "Last-Modified";

/// HTTP method used by the caching source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Head => write!(f, "HEAD"),
        }
    }
}

/// A single request handed to a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            timeout,
        }
    }

    pub fn head(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: Method::Head,
            timeout,
        }
    }
}

/// Errors a transport reports inside a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The origin answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Connection or protocol failure.
    #[error("Request failed: {0}")]
    Request(String),

    /// The body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

/// Where a response delivered to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from a cache backend without touching the network.
    Cache,
    /// Fetched from the origin.
    Network,
}

/// Outcome of a request, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub url: String,
    pub method: Method,
    /// HTTP status, when the origin answered at all.
    pub status: Option<u16>,
    /// Response headers. Lookups are case-sensitive.
    pub headers: HashMap<String, String>,
    pub data: Option<Bytes>,
    pub error: Option<TransportError>,
    pub source: ResponseSource,
    /// Set by the caching source once a fetched body has been written to the caches.
    pub is_update: bool,
}

impl Response {
    /// A completed network response.
    pub fn network(
        url: impl Into<String>,
        method: Method,
        status: u16,
        headers: HashMap<String, String>,
        data: Option<Bytes>,
    ) -> Self {
        Self {
            url: url.into(),
            method,
            status: Some(status),
            headers,
            data,
            error: None,
            source: ResponseSource::Network,
            is_update: false,
        }
    }

    /// A failed network response.
    pub fn failed(url: impl Into<String>, method: Method, error: TransportError) -> Self {
        Self {
            url: url.into(),
            method,
            status: None,
            headers: HashMap::new(),
            data: None,
            error: Some(error),
            source: ResponseSource::Network,
            is_update: false,
        }
    }

    /// A response synthesised from a cache hit.
    pub fn from_cache(url: impl Into<String>, item: &CacheItem) -> Self {
        let mut headers = HashMap::new();
        if let Some(etag) = &item.etag {
            headers.insert(ETAG_HEADER.to_string(), etag.clone());
        }
        if let Some(last_modified) = item.last_modified {
            headers.insert(LAST_MODIFIED_HEADER.to_string(), last_modified.to_rfc2822());
        }

        Self {
            url: url.into(),
            method: Method::Get,
            status: None,
            headers,
            data: Some(item.data.clone()),
            error: None,
            source: ResponseSource::Cache,
            is_update: false,
        }
    }

    /// Attach a status code to a failed response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_from_cache(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    /// Header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The `ETag` header, treating an empty value as absent.
    pub fn etag(&self) -> Option<&str> {
        self.header(ETAG_HEADER).filter(|e| !e.is_empty())
    }

    /// The `Last-Modified` header parsed as an HTTP date.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.header(LAST_MODIFIED_HEADER)
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_header_lookup_is_case_sensitive() {
        let response = Response::network(
            "https://tiles.example.com/1/2/3",
            Method::Get,
            200,
            headers(&[("ETag", "\"abc\"")]),
            None,
        );
        assert_eq!(response.header("ETag"), Some("\"abc\""));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn test_last_modified_parses_http_date() {
        let response = Response::network(
            "https://tiles.example.com/1/2/3",
            Method::Head,
            200,
            headers(&[("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")]),
            None,
        );
        let parsed = response.last_modified().unwrap();
        assert_eq!(parsed.timestamp(), 1_445_412_480);
    }

    #[test]
    fn test_invalid_last_modified_is_ignored() {
        let response = Response::network(
            "https://tiles.example.com/1/2/3",
            Method::Get,
            200,
            headers(&[("Last-Modified", "yesterday")]),
            None,
        );
        assert!(response.last_modified().is_none());
    }

    #[test]
    fn test_empty_etag_is_absent() {
        let response = Response::network(
            "https://tiles.example.com/1/2/3",
            Method::Get,
            200,
            headers(&[("ETag", "")]),
            None,
        );
        assert!(response.etag().is_none());
    }

    #[test]
    fn test_from_cache_carries_validators() {
        let item = CacheItem::new(vec![1, 2]).with_etag(Some("\"v1\""));
        let response = Response::from_cache("https://tiles.example.com/1/2/3", &item);

        assert!(response.is_from_cache());
        assert!(!response.is_update);
        assert!(!response.has_error());
        assert_eq!(response.etag(), Some("\"v1\""));
        assert_eq!(response.data.as_deref(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_failed_response() {
        let response = Response::failed("u", Method::Get, TransportError::Timeout);
        assert!(response.has_error());
        assert_eq!(response.error, Some(TransportError::Timeout));
        assert!(response.data.is_none());
    }
}
