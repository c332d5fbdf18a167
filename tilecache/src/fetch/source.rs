//! The caching tile source.
//!
//! `CachingTileSource` composes an ordered list of cache backends with a
//! network transport.
//!
//! ```text
//! request(url, tile, tileset)
//!   │
//!   ├── backends[0] ── hit ─┐
//!   ├── backends[1] ── hit ─┤──► callback(cached) ──► [auto refresh] HEAD
//!   └── ...                 │                            ├── ETag equal: seed other backends (no force)
//!                           │                            └── otherwise: GET + store (force)
//!   miss ──► GET ──► store in every backend (force) ──► callback(fresh)
//! ```
//!
//! The source holds no per-request state. Every request gets exactly one
//! callback; background revalidation only updates backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::FetchError;
use super::handle::RequestHandle;
use super::stats::{FetchStats, FetchStatsSnapshot};
use super::url::Credentials;
use crate::cache::{CacheError, CacheItem, TileCache};
use crate::coord::TileId;
use crate::transport::{Method, Response, Transport, TransportError, TransportRequest};

/// Default timeout for origin requests in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Settings captured when a caching source is built.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Tokens appended to every origin request.
    pub credentials: Credentials,
    /// Issue a background HEAD check after every cache hit.
    pub auto_refresh: bool,
}

impl SourceConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            auto_refresh: true,
        }
    }

    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

/// Everything a spawned fetch needs, detached from the source's lifetime.
struct FetchContext<T: Transport> {
    transport: Arc<T>,
    caches: Vec<Arc<dyn TileCache>>,
    stats: Arc<FetchStats>,
    timeout: Duration,
}

impl<T: Transport> FetchContext<T> {
    /// Write `item` to every backend in registration order, optionally skipping one.
    async fn fan_out(
        &self,
        tileset: &str,
        tile: TileId,
        item: &CacheItem,
        force_insert: bool,
        skip: Option<usize>,
    ) {
        for (index, cache) in self.caches.iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            if let Err(e) = cache.add(tileset, tile, item.clone(), force_insert).await {
                warn!(
                    backend = cache.name(),
                    tileset,
                    tile = %tile,
                    error = %e,
                    "Failed to store tile"
                );
            }
        }
    }

    /// Cache a completed GET response and mark it as an update.
    ///
    /// Failed and body-less responses pass through untouched.
    async fn store_response(&self, mut response: Response, tileset: &str, tile: TileId) -> Response {
        if response.has_error() {
            self.stats.record_error();
            debug!(
                tileset,
                tile = %tile,
                error = ?response.error,
                "Tile fetch failed; caches left unchanged"
            );
            return response;
        }

        if let Some(data) = response.data.clone() {
            let etag = response.etag().map(str::to_string);
            if etag.is_none() {
                warn!(
                    tileset,
                    tile = %tile,
                    "Response has no ETag; tile will be refetched on every revalidation"
                );
            }
            let item = CacheItem::new(data)
                .with_etag(etag)
                .with_last_modified(response.last_modified());
            self.fan_out(tileset, tile, &item, true, None).await;
            response.is_update = true;
        }

        response
    }

    /// Background freshness check after a cache hit.
    async fn revalidate(
        &self,
        url: String,
        tileset: &str,
        tile: TileId,
        cached: CacheItem,
        hit_index: usize,
    ) {
        self.stats.record_revalidation();
        let head = self
            .transport
            .send(TransportRequest::head(url.clone(), self.timeout))
            .await;

        if head.has_error() {
            debug!(tileset, tile = %tile, error = ?head.error, "Revalidation failed; keeping cached tile");
            return;
        }

        if cached.etag_matches(head.etag()) {
            self.stats.record_revalidation_hit();
            debug!(tileset, tile = %tile, "Cached tile is current");
            self.fan_out(tileset, tile, &cached, false, Some(hit_index))
                .await;
            return;
        }

        debug!(
            tileset,
            tile = %tile,
            cached = ?cached.etag,
            origin = ?head.etag(),
            "Cached tile is stale, refetching"
        );
        self.stats.record_network_fetch();
        let response = self
            .transport
            .send(TransportRequest::get(url, self.timeout))
            .await;
        self.store_response(response, tileset, tile).await;
    }
}

/// Layered tile cache in front of an HTTP origin.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tilecache::cache::{MemoryCache, SqliteCache};
/// use tilecache::fetch::{CachingTileSource, Credentials, SourceConfig};
/// use tilecache::transport::ReqwestTransport;
///
/// let mut source = CachingTileSource::new(
///     ReqwestTransport::new()?,
///     SourceConfig::new(Credentials::new("pk.token", "sku")),
/// );
/// source
///     .add_cache(Arc::new(MemoryCache::new(500)))
///     .add_cache(Arc::new(SqliteCache::open_in(&dir, "tiles", 3000, 20)?));
///
/// let handle = source
///     .request(url, |response| { /* decode */ }, Duration::from_secs(10), tile, "streets")
///     .await?;
/// ```
pub struct CachingTileSource<T: Transport> {
    transport: Arc<T>,
    caches: Vec<Arc<dyn TileCache>>,
    config: SourceConfig,
    stats: Arc<FetchStats>,
    shutdown: CancellationToken,
    disposed: AtomicBool,
}

impl<T: Transport> CachingTileSource<T> {
    /// Create a source with no backends registered.
    pub fn new(transport: T, config: SourceConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            caches: Vec::new(),
            config,
            stats: Arc::new(FetchStats::new()),
            shutdown: CancellationToken::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Register a backend behind the ones already added.
    ///
    /// Backends with a capacity of zero are disabled and skipped. Call during
    /// setup only, not while requests are in flight.
    pub fn add_cache(&mut self, cache: Arc<dyn TileCache>) -> &mut Self {
        if cache.max_cache_size() == 0 {
            info!(backend = cache.name(), "Skipping cache with zero capacity");
            return self;
        }
        debug!(
            backend = cache.name(),
            position = self.caches.len(),
            max_cache_size = cache.max_cache_size(),
            "Registered cache"
        );
        self.caches.push(cache);
        self
    }

    /// Number of registered backends.
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn context(&self, timeout: Duration) -> FetchContext<T> {
        FetchContext {
            transport: Arc::clone(&self.transport),
            caches: self.caches.clone(),
            stats: Arc::clone(&self.stats),
            timeout,
        }
    }

    /// First backend holding the tile, with its position.
    async fn lookup(&self, tileset: &str, tile: TileId) -> Option<(usize, CacheItem)> {
        for (index, cache) in self.caches.iter().enumerate() {
            match cache.get(tileset, tile).await {
                Ok(Some(item)) => {
                    debug!(backend = cache.name(), tileset, tile = %tile, "Cache hit");
                    return Some((index, item));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        backend = cache.name(),
                        tileset,
                        tile = %tile,
                        error = %e,
                        "Cache lookup failed, treating as miss"
                    );
                }
            }
        }
        None
    }

    /// Request a tile.
    ///
    /// On a cache hit `callback` runs before this returns and the handle is
    /// already complete. On a miss the tile is fetched in the background and
    /// `callback` runs once the fetch completes, fails, or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` without invoking `callback` when `tileset` is
    /// empty, `url` is not absolute, or the source was disposed.
    pub async fn request<F>(
        &self,
        url: &str,
        callback: F,
        timeout: Duration,
        tile: TileId,
        tileset: &str,
    ) -> Result<RequestHandle, FetchError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        if tileset.is_empty() {
            return Err(FetchError::MissingTilesetId);
        }
        if self.is_disposed() {
            return Err(FetchError::Disposed);
        }
        let authorized = self.config.credentials.authorize(url)?;

        if let Some((hit_index, item)) = self.lookup(tileset, tile).await {
            self.stats.record_hit();
            callback(Response::from_cache(url, &item));

            if self.config.auto_refresh {
                let ctx = self.context(timeout);
                let shutdown = self.shutdown.clone();
                let tileset = tileset.to_string();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = ctx.revalidate(authorized, &tileset, tile, item, hit_index) => {}
                    }
                });
            }
            return Ok(RequestHandle::completed());
        }

        self.stats.record_miss();
        self.stats.record_network_fetch();
        debug!(tileset, tile = %tile, "Cache miss, fetching from origin");

        let ctx = self.context(timeout);
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        let tileset = tileset.to_string();
        let task = tokio::spawn(async move {
            let request = TransportRequest::get(authorized.clone(), ctx.timeout);
            let completed = tokio::select! {
                biased;
                _ = cancelled.cancelled() => None,
                response = ctx.transport.send(request) => Some(response),
            };

            let response = match completed {
                Some(response) => ctx.store_response(response, &tileset, tile).await,
                None => {
                    ctx.stats.record_cancellation();
                    debug!(tileset = %tileset, tile = %tile, "Tile request cancelled");
                    Response::failed(authorized, Method::Get, TransportError::Cancelled)
                }
            };
            callback(response);
        });

        Ok(RequestHandle::network(token, task))
    }

    /// Remove every entry from every backend, in registration order.
    ///
    /// Not atomic across backends. All backends are attempted; the first
    /// error is returned.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut first_error = None;
        for cache in &self.caches {
            if let Err(e) = cache.clear().await {
                warn!(backend = cache.name(), error = %e, "Failed to clear cache");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reacquire backend resources after `clear`, in registration order.
    pub async fn reinit(&self) -> Result<(), CacheError> {
        let mut first_error = None;
        for cache in &self.caches {
            if let Err(e) = cache.reinit().await {
                warn!(backend = cache.name(), error = %e, "Failed to reinitialise cache");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stop background work and release every backend. Safe to call twice.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();
        for cache in &self.caches {
            cache.dispose();
        }
        debug!(backends = self.caches.len(), "Caching tile source disposed");
    }
}

impl<T: Transport> Drop for CachingTileSource<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
