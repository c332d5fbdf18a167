//! Persistent tile cache backed by a single SQLite file.
//!
//! # Storage layout
//!
//! ```text
//! tilesets(id, name)
//! tiles(tile_set, zoom, x, y, data, etag, last_modified, added, seq)
//!       └── primary key (tile_set, zoom, x, y)
//! ```
//!
//! `seq` is a store-wide insertion counter. It is refreshed by forced
//! overwrites and drives FIFO pruning.
//!
//! # Pruning
//!
//! Every insert that grows the table checks the row count against
//! `max_cache_size + prune_cache_delta` (saturating at `u64::MAX`). Once over,
//! the oldest rows by `seq` are deleted until exactly `max_cache_size` remain.
//! The delta batches the deletions so a full store does not prune on every
//! insert.
//!
//! # Concurrency
//!
//! One connection sits behind a `parking_lot::Mutex`, giving a single writer.
//! All SQLite work runs on Tokio's blocking pool so async callers never stall
//! a runtime worker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use super::item::CacheItem;
use super::traits::{BoxFuture, CacheError, TileCache};
use crate::coord::TileId;

/// Default number of tiles kept on disk.
pub const DEFAULT_DISK_CACHE_SIZE: u64 = 3000;

/// Default hysteresis band above the capacity before pruning kicks in.
pub const DEFAULT_PRUNE_CACHE_DELTA: u64 = 20;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tilesets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS tiles (
        tile_set INTEGER NOT NULL REFERENCES tilesets(id),
        zoom INTEGER NOT NULL,
        x INTEGER NOT NULL,
        y INTEGER NOT NULL,
        data BLOB NOT NULL,
        etag TEXT,
        last_modified INTEGER,
        added INTEGER NOT NULL,
        seq INTEGER NOT NULL,
        PRIMARY KEY (tile_set, zoom, x, y)
    );
    CREATE INDEX IF NOT EXISTS tiles_seq ON tiles (seq);
";

/// An open connection plus the counters derived from it.
struct Store {
    conn: Connection,
    total_rows: u64,
    next_seq: i64,
}

impl Store {
    fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        let total_rows: i64 = conn.query_row("SELECT COUNT(*) FROM tiles", [], |r| r.get(0))?;
        let max_seq: i64 =
            conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM tiles", [], |r| r.get(0))?;

        Ok(Self {
            conn,
            total_rows: total_rows as u64,
            next_seq: max_seq + 1,
        })
    }

    fn tileset_id(tx: &Transaction<'_>, tileset: &str) -> Result<i64, CacheError> {
        tx.execute(
            "INSERT OR IGNORE INTO tilesets (name) VALUES (?1)",
            params![tileset],
        )?;
        let id = tx.query_row(
            "SELECT id FROM tilesets WHERE name = ?1",
            params![tileset],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn get(&self, tileset: &str, tile: TileId) -> Result<Option<CacheItem>, CacheError> {
        let row = self
            .conn
            .query_row(
                "SELECT t.data, t.etag, t.last_modified, t.added
                 FROM tiles t JOIN tilesets s ON s.id = t.tile_set
                 WHERE s.name = ?1 AND t.zoom = ?2 AND t.x = ?3 AND t.y = ?4",
                params![tileset, tile.zoom, tile.x, tile.y],
                |r| {
                    Ok((
                        r.get::<_, Vec<u8>>(0)?,
                        r.get::<_, Option<String>>(1)?,
                        r.get::<_, Option<i64>>(2)?,
                        r.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(data, etag, last_modified, added)| CacheItem {
            data: Bytes::from(data),
            etag: etag.filter(|e| !e.is_empty()),
            last_modified: last_modified.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            added_to_cache: DateTime::from_timestamp_millis(added).unwrap_or_else(Utc::now),
        }))
    }

    /// Returns `true` when a new row was created.
    fn add(
        &mut self,
        tileset: &str,
        tile: TileId,
        item: &CacheItem,
        force_insert: bool,
    ) -> Result<bool, CacheError> {
        let seq = self.next_seq;
        let tx = self.conn.transaction()?;
        let tileset_id = Self::tileset_id(&tx, tileset)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM tiles WHERE tile_set = ?1 AND zoom = ?2 AND x = ?3 AND y = ?4",
                params![tileset_id, tile.zoom, tile.x, tile.y],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let last_modified = item.last_modified.map(|lm| lm.timestamp());
        let added = item.added_to_cache.timestamp_millis();

        if exists {
            if !force_insert {
                return Ok(false);
            }
            tx.execute(
                "UPDATE tiles SET data = ?5, etag = ?6, last_modified = ?7, added = ?8, seq = ?9
                 WHERE tile_set = ?1 AND zoom = ?2 AND x = ?3 AND y = ?4",
                params![
                    tileset_id,
                    tile.zoom,
                    tile.x,
                    tile.y,
                    item.data.as_ref(),
                    item.etag.as_deref(),
                    last_modified,
                    added,
                    seq
                ],
            )?;
        } else {
            tx.execute(
                "INSERT INTO tiles (tile_set, zoom, x, y, data, etag, last_modified, added, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    tileset_id,
                    tile.zoom,
                    tile.x,
                    tile.y,
                    item.data.as_ref(),
                    item.etag.as_deref(),
                    last_modified,
                    added,
                    seq
                ],
            )?;
        }
        tx.commit()?;

        self.next_seq += 1;
        if !exists {
            self.total_rows += 1;
        }
        Ok(!exists)
    }

    fn tile_count(&self, tileset: &str) -> Result<u64, CacheError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tiles t JOIN tilesets s ON s.id = t.tile_set WHERE s.name = ?1",
            params![tileset],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    /// Delete the oldest rows until `target` remain. Returns rows removed.
    fn prune_to(&mut self, target: u64) -> Result<u64, CacheError> {
        let excess = self.total_rows.saturating_sub(target);
        if excess == 0 {
            return Ok(0);
        }
        let removed = self.conn.execute(
            "DELETE FROM tiles WHERE rowid IN (SELECT rowid FROM tiles ORDER BY seq ASC LIMIT ?1)",
            params![excess as i64],
        )? as u64;
        self.total_rows = self.total_rows.saturating_sub(removed);
        Ok(removed)
    }
}

/// Disk tier of the tile cache.
///
/// `clear` deletes the database file and leaves the cache closed; call
/// `reinit` before writing again. While closed, lookups return "not found"
/// and counts return zero.
pub struct SqliteCache {
    path: PathBuf,
    max_cache_size: u64,
    prune_cache_delta: u64,
    store: Arc<Mutex<Option<Store>>>,
}

impl SqliteCache {
    /// Resolve the database file for a logical name inside `directory`.
    ///
    /// `.db` is appended when the name has no extension, so `"tiles"` and
    /// `"tiles.db"` address the same file.
    pub fn database_path(directory: &Path, database_name: &str) -> PathBuf {
        let path = directory.join(database_name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("db")
        }
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Database file
    /// * `max_cache_size` - Rows kept after a prune; zero disables the cache
    /// * `prune_cache_delta` - Rows tolerated above the capacity before pruning
    pub fn open(
        path: impl Into<PathBuf>,
        max_cache_size: u64,
        prune_cache_delta: u64,
    ) -> Result<Self, CacheError> {
        let path = path.into();
        let store = Store::open(&path)?;
        info!(
            path = %path.display(),
            rows = store.total_rows,
            max_cache_size,
            prune_cache_delta,
            "Opened disk tile cache"
        );

        Ok(Self {
            path,
            max_cache_size,
            prune_cache_delta,
            store: Arc::new(Mutex::new(Some(store))),
        })
    }

    /// Open the database named `database_name` inside `directory`.
    pub fn open_in(
        directory: &Path,
        database_name: &str,
        max_cache_size: u64,
        prune_cache_delta: u64,
    ) -> Result<Self, CacheError> {
        Self::open(
            Self::database_path(directory, database_name),
            max_cache_size,
            prune_cache_delta,
        )
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows tolerated above `max_cache_size` before a prune runs.
    pub fn prune_cache_delta(&self) -> u64 {
        self.prune_cache_delta
    }

    /// Whether the connection is currently open.
    pub fn is_open(&self) -> bool {
        self.store.lock().is_some()
    }

    /// Total rows across every tileset. Zero when closed.
    pub fn total_count(&self) -> u64 {
        self.store.lock().as_ref().map_or(0, |s| s.total_rows)
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Option<Store>) -> Result<T, CacheError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))?
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl TileCache for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
    ) -> BoxFuture<'a, Result<Option<CacheItem>, CacheError>> {
        let tileset = tileset.to_string();
        Box::pin(self.with_store(move |store| match store {
            Some(store) => store.get(&tileset, tile),
            None => Ok(None),
        }))
    }

    fn add<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
        item: CacheItem,
        force_insert: bool,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        let tileset = tileset.to_string();
        let trigger = self.max_cache_size.saturating_add(self.prune_cache_delta);
        let target = self.max_cache_size;
        Box::pin(self.with_store(move |store| {
            let Some(store) = store else {
                warn!(tileset = %tileset, tile = %tile, "Disk cache is closed, dropping tile; call reinit first");
                return Ok(());
            };

            let inserted = store.add(&tileset, tile, &item, force_insert)?;
            if inserted && store.total_rows > trigger {
                let removed = store.prune_to(target)?;
                info!(removed, remaining = store.total_rows, "Pruned disk tile cache");
            }
            Ok(())
        }))
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.path.clone();
        Box::pin(self.with_store(move |store| {
            // Dropping the connection closes the file before it is removed
            drop(store.take());

            remove_if_exists(&path)?;
            let mut wal = path.clone().into_os_string();
            wal.push("-wal");
            remove_if_exists(Path::new(&wal))?;
            let mut shm = path.clone().into_os_string();
            shm.push("-shm");
            remove_if_exists(Path::new(&shm))?;

            info!(path = %path.display(), "Cleared disk tile cache");
            Ok(())
        }))
    }

    fn reinit(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.path.clone();
        Box::pin(self.with_store(move |store| {
            if store.is_none() {
                *store = Some(Store::open(&path)?);
                debug!(path = %path.display(), "Reopened disk tile cache");
            }
            Ok(())
        }))
    }

    fn tile_count<'a>(&'a self, tileset: &'a str) -> BoxFuture<'a, Result<u64, CacheError>> {
        let tileset = tileset.to_string();
        Box::pin(self.with_store(move |store| match store {
            Some(store) => store.tile_count(&tileset),
            None => Ok(0),
        }))
    }

    fn max_cache_size(&self) -> u64 {
        self.max_cache_size
    }

    fn dispose(&self) {
        if self.store.lock().take().is_some() {
            debug!(path = %self.path.display(), "Closed disk tile cache");
        }
    }
}

impl Drop for SqliteCache {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tile(x: u32) -> TileId {
        TileId::new(14, x, 6000)
    }

    fn open_cache(dir: &TempDir, max: u64, delta: u64) -> SqliteCache {
        SqliteCache::open_in(dir.path(), "tiles", max, delta).unwrap()
    }

    #[test]
    fn test_database_path_appends_extension() {
        let dir = Path::new("/cache");
        assert_eq!(
            SqliteCache::database_path(dir, "tiles"),
            PathBuf::from("/cache/tiles.db")
        );
        assert_eq!(
            SqliteCache::database_path(dir, "tiles.db"),
            PathBuf::from("/cache/tiles.db")
        );
    }

    #[tokio::test]
    async fn test_round_trip_keeps_validators() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);
        let last_modified = DateTime::from_timestamp(1_445_412_480, 0);
        let item = CacheItem::new(vec![1, 2, 3])
            .with_etag(Some("\"33a64df5\""))
            .with_last_modified(last_modified);

        cache.add("streets", tile(1), item.clone(), true).await.unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.data, item.data);
        assert_eq!(found.etag, item.etag);
        assert_eq!(found.last_modified, last_modified);
    }

    #[tokio::test]
    async fn test_legacy_empty_etag_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);
        {
            let mut guard = cache.store.lock();
            let store = guard.as_mut().unwrap();
            let tx = store.conn.transaction().unwrap();
            let id = Store::tileset_id(&tx, "streets").unwrap();
            tx.execute(
                "INSERT INTO tiles (tile_set, zoom, x, y, data, etag, added, seq)
                 VALUES (?1, 14, 1, 6000, x'01', '', 0, 1)",
                params![id],
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.etag, None);
    }

    #[tokio::test]
    async fn test_no_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);

        cache
            .add("streets", tile(1), CacheItem::new(vec![1]), false)
            .await
            .unwrap();
        cache
            .add("streets", tile(1), CacheItem::new(vec![2]), false)
            .await
            .unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.data.as_ref(), &[1]);
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forced_overwrite_keeps_single_row() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);

        cache
            .add("streets", tile(1), CacheItem::new(vec![1]), true)
            .await
            .unwrap();
        cache
            .add(
                "streets",
                tile(1),
                CacheItem::new(vec![2]).with_etag(Some("\"b\"")),
                true,
            )
            .await
            .unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.data.as_ref(), &[2]);
        assert_eq!(found.etag.as_deref(), Some("\"b\""));
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
        assert_eq!(cache.total_count(), 1);
    }

    #[tokio::test]
    async fn test_pruning_removes_oldest_rows() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 10, 5);

        for x in 0..16 {
            cache
                .add("streets", tile(x), CacheItem::new(vec![x as u8]), true)
                .await
                .unwrap();
        }

        assert_eq!(cache.total_count(), 10);
        assert_eq!(cache.tile_count("streets").await.unwrap(), 10);
        for x in 0..6 {
            assert!(cache.get("streets", tile(x)).await.unwrap().is_none());
        }
        for x in 6..16 {
            assert!(cache.get("streets", tile(x)).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_pruning_waits_for_delta() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 10, 5);

        for x in 0..15 {
            cache
                .add("streets", tile(x), CacheItem::new(vec![0]), true)
                .await
                .unwrap();
        }

        assert_eq!(cache.total_count(), 15);
    }

    #[tokio::test]
    async fn test_unbounded_capacity_never_prunes() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, u64::MAX, 20);

        for x in 0..30 {
            cache
                .add("streets", tile(x), CacheItem::new(vec![0]), false)
                .await
                .unwrap();
        }

        assert_eq!(cache.total_count(), 30);
        assert!(cache.get("streets", tile(0)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_forced_overwrite_refreshes_prune_order() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 2, 0);

        cache.add("s", tile(0), CacheItem::new(vec![0]), true).await.unwrap();
        cache.add("s", tile(1), CacheItem::new(vec![1]), true).await.unwrap();
        // Rewriting tile 0 makes tile 1 the oldest
        cache.add("s", tile(0), CacheItem::new(vec![9]), true).await.unwrap();
        cache.add("s", tile(2), CacheItem::new(vec![2]), true).await.unwrap();

        assert!(cache.get("s", tile(0)).await.unwrap().is_some());
        assert!(cache.get("s", tile(1)).await.unwrap().is_none());
        assert!(cache.get("s", tile(2)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_then_reinit() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);

        cache.add("a", tile(1), CacheItem::new(vec![1]), true).await.unwrap();
        cache.add("b", tile(1), CacheItem::new(vec![1]), true).await.unwrap();

        cache.clear().await.unwrap();
        assert!(!cache.is_open());
        assert!(!cache.path().exists());

        // Closed store fails soft
        assert!(cache.get("a", tile(1)).await.unwrap().is_none());
        assert_eq!(cache.tile_count("a").await.unwrap(), 0);

        cache.reinit().await.unwrap();
        cache.reinit().await.unwrap();
        assert_eq!(cache.tile_count("a").await.unwrap(), 0);
        assert_eq!(cache.tile_count("b").await.unwrap(), 0);

        cache.add("a", tile(1), CacheItem::new(vec![7]), true).await.unwrap();
        assert_eq!(cache.tile_count("a").await.unwrap(), 1);
        assert!(cache.get("a", tile(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_while_closed_is_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, 100, 10);
        cache.clear().await.unwrap();

        cache.add("a", tile(1), CacheItem::new(vec![1]), true).await.unwrap();
        cache.reinit().await.unwrap();

        assert_eq!(cache.tile_count("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open_cache(&dir, 100, 10);
            cache.add("a", tile(1), CacheItem::new(vec![1]), true).await.unwrap();
            cache.dispose();
            cache.dispose();
        }

        let cache = open_cache(&dir, 100, 10);
        assert_eq!(cache.total_count(), 1);
        assert!(cache.get("a", tile(1)).await.unwrap().is_some());
    }
}
