//! Cached tile payload plus its HTTP validators.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A cached tile body together with the validators the origin sent for it.
///
/// An empty ETag is normalised to `None` so rows written before validators
/// were tracked behave the same as responses that never carried one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    /// The tile body.
    pub data: Bytes,
    /// Opaque validator from the origin's `ETag` header.
    pub etag: Option<String>,
    /// Timestamp from the origin's `Last-Modified` header.
    pub last_modified: Option<DateTime<Utc>>,
    /// When the item entered the cache.
    pub added_to_cache: DateTime<Utc>,
}

impl CacheItem {
    /// Create an item stamped with the current time and no validators.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            etag: None,
            last_modified: None,
            added_to_cache: Utc::now(),
        }
    }

    /// Set the ETag. Empty strings are stored as `None`.
    pub fn with_etag<S: Into<String>>(mut self, etag: Option<S>) -> Self {
        self.etag = etag.map(Into::into).filter(|e| !e.is_empty());
        self
    }

    /// Set the Last-Modified validator.
    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Override the insertion timestamp.
    pub fn with_added_to_cache(mut self, added: DateTime<Utc>) -> Self {
        self.added_to_cache = added;
        self
    }

    /// Whether a HEAD check can be short-circuited with this item's ETag.
    pub fn has_etag(&self) -> bool {
        self.etag.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// True when `other` is a non-empty validator equal to ours.
    pub fn etag_matches(&self, other: Option<&str>) -> bool {
        match (self.etag.as_deref(), other) {
            (Some(ours), Some(theirs)) => !ours.is_empty() && ours == theirs,
            _ => false,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_etag_is_none() {
        let item = CacheItem::new(vec![1, 2, 3]).with_etag(Some(""));
        assert_eq!(item.etag, None);
        assert!(!item.has_etag());
    }

    #[test]
    fn test_etag_matches() {
        let item = CacheItem::new(vec![1]).with_etag(Some("\"abc\""));
        assert!(item.etag_matches(Some("\"abc\"")));
        assert!(!item.etag_matches(Some("\"def\"")));
        assert!(!item.etag_matches(None));
    }

    #[test]
    fn test_missing_etag_never_matches() {
        let item = CacheItem::new(vec![1]);
        assert!(!item.etag_matches(Some("")));
        assert!(!item.etag_matches(Some("\"abc\"")));
    }

    #[test]
    fn test_len() {
        let item = CacheItem::new(vec![0u8; 42]);
        assert_eq!(item.len(), 42);
        assert!(!item.is_empty());
    }
}
