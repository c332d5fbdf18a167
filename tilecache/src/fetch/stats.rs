//! Request counters for the caching source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the caching source.
#[derive(Debug, Default)]
pub struct FetchStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_fetches: AtomicU64,
    revalidations: AtomicU64,
    revalidation_hits: AtomicU64,
    errors: AtomicU64,
    cancellations: AtomicU64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_revalidation(&self) {
        self.revalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_revalidation_hit(&self) {
        self.revalidation_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
            revalidation_hits: self.revalidation_hits.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FetchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// GET requests sent to the origin, including background refetches.
    pub network_fetches: u64,
    /// HEAD checks issued after cache hits.
    pub revalidations: u64,
    /// HEAD checks whose ETag matched the cached tile.
    pub revalidation_hits: u64,
    pub errors: u64,
    pub cancellations: u64,
}

impl FetchStatsSnapshot {
    /// Fraction of requests served from cache, 0.0 when idle.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for FetchStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} fetches={} revalidations={} (matched {}) errors={} cancelled={}",
            self.cache_hits,
            self.cache_misses,
            self.network_fetches,
            self.revalidations,
            self.revalidation_hits,
            self.errors,
            self.cancellations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = FetchStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_network_fetch();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.network_fetches, 1);
        assert!((snapshot.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_idle() {
        assert_eq!(FetchStatsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let snapshot = FetchStatsSnapshot {
            cache_hits: 3,
            revalidation_hits: 1,
            ..Default::default()
        };
        let display = snapshot.to_string();
        assert!(display.contains("hits=3"));
        assert!(display.contains("matched 1"));
    }
}
