//! Cached database with hot reload support.
//!
//! This module provides a lookup front end with:
//! - LRU cache for lookup results
//! - Atomic hot reload support for swapping database files without downtime
//! - Thread-safe concurrent access

use arc_swap::ArcSwap;
use quick_cache::sync::Cache;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::reader::{parse_ipv4, Database, Location};
use super::source::{ByteSource, DynSource};
use crate::{CachedDatabaseConfig, DatabaseConfig, Error, Result};

/// Cached outcome of one lookup; `None` records "below coverage".
type CachedLocation = Option<Arc<Location>>;

/// Cached database with hot reload support.
///
/// This wraps [`Database`] and adds:
/// - LRU cache keyed by reload generation and address, holding both hits
///   and `NotFound`
/// - Atomic hot reload to replace the database without service interruption
///
/// Malformed-record errors are never cached.
///
/// # Example
///
/// ```ignore
/// use qqwry::CachedDatabase;
/// use std::path::Path;
///
/// let db = CachedDatabase::open(Path::new("qqwry.dat"))?;
/// let location = db.lookup("1.2.3.4".parse()?)?;
///
/// // Hot reload a newer release
/// db.reload(Path::new("qqwry_new.dat"))?;
/// ```
pub struct CachedDatabase<S: ByteSource = DynSource> {
    /// The underlying database, wrapped in ArcSwap for atomic replacement.
    inner: ArcSwap<Database<S>>,
    /// LRU cache for lookup results, keyed by (generation, address).
    cache: Option<Cache<(u64, u32), CachedLocation>>,
    /// Options used when reloading from a path.
    db_config: DatabaseConfig,
    /// Cache configuration.
    config: CachedDatabaseConfig,
    /// Generation counter for cache invalidation.
    generation: AtomicU64,
}

impl CachedDatabase<DynSource> {
    /// Open a database file with default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(
            path,
            DatabaseConfig::default(),
            CachedDatabaseConfig::default(),
        )
    }

    /// Open a database file with custom configuration.
    pub fn open_with_config(
        path: &Path,
        db_config: DatabaseConfig,
        config: CachedDatabaseConfig,
    ) -> Result<Self> {
        let db = Database::open_with_config(path, &db_config)?;
        Ok(Self::new(db, db_config, config))
    }

    /// Hot reload from a new database file.
    ///
    /// This atomically replaces the underlying database and clears the cache.
    /// In-flight lookups complete against the old file, new lookups use the
    /// new one.
    pub fn reload(&self, path: &Path) -> Result<()> {
        let db = Database::open_with_config(path, &self.db_config)?;
        self.swap(db);
        log::info!("Hot reloaded database from {:?}", path);
        Ok(())
    }
}

impl CachedDatabase<Vec<u8>> {
    /// Create from bytes with default configuration.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_config(data, CachedDatabaseConfig::default())
    }

    /// Create from bytes with custom cache configuration.
    pub fn from_bytes_with_config(data: Vec<u8>, config: CachedDatabaseConfig) -> Result<Self> {
        let db = Database::from_bytes(data)?;
        Ok(Self::new(db, DatabaseConfig::default(), config))
    }

    /// Hot reload from bytes.
    pub fn reload_from_bytes(&self, data: Vec<u8>) -> Result<()> {
        let db = Database::from_source(data, &self.db_config)?;
        self.swap(db);
        log::info!("Hot reloaded database from bytes");
        Ok(())
    }
}

impl<S: ByteSource> CachedDatabase<S> {
    /// Wrap an already opened database.
    pub fn new(db: Database<S>, db_config: DatabaseConfig, config: CachedDatabaseConfig) -> Self {
        let cache = if config.cache_enabled && config.cache_capacity > 0 {
            Some(Cache::new(config.cache_capacity))
        } else {
            None
        };

        Self {
            inner: ArcSwap::from_pointee(db),
            cache,
            db_config,
            config,
            generation: AtomicU64::new(0),
        }
    }

    fn swap(&self, db: Database<S>) {
        self.inner.store(Arc::new(db));

        // Bumping the generation retires every existing key
        self.generation.fetch_add(1, Ordering::SeqCst);

        // Drop retired entries now rather than waiting for eviction
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Look up an address with caching.
    pub fn lookup(&self, ip: Ipv4Addr) -> Result<Arc<Location>> {
        let key = (self.generation(), u32::from(ip));

        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get(&key) {
                return cached.ok_or(Error::NotFound(ip));
            }
        }

        // Cache miss - perform lookup
        let (generation, result) = self.lookup_uncached(ip)?;
        self.remember(generation, ip, result.clone());
        result.ok_or(Error::NotFound(ip))
    }

    /// Look up against the current database, returning the generation it
    /// belongs to.
    fn lookup_uncached(&self, ip: Ipv4Addr) -> Result<(u64, CachedLocation)> {
        // Generation before database: `swap` stores first, so a reader that
        // sees the new generation also sees the new database.
        let generation = self.generation();
        let db = self.inner.load();
        match db.lookup(ip) {
            Ok(location) => Ok((generation, Some(Arc::new(location)))),
            Err(Error::NotFound(_)) => Ok((generation, None)),
            Err(e) => Err(e),
        }
    }

    /// Cache a result under the generation it was computed for. Entries from
    /// a replaced database are never read again.
    fn remember(&self, generation: u64, ip: Ipv4Addr, result: CachedLocation) {
        if let Some(ref cache) = self.cache {
            cache.insert((generation, u32::from(ip)), result);
        }
    }

    /// Parse `ip_text` and look it up with caching.
    pub fn lookup_str(&self, ip_text: &str) -> Result<Arc<Location>> {
        self.lookup(parse_ipv4(ip_text)?)
    }

    /// Clear the cache.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        if let Some(ref cache) = self.cache {
            CacheStats {
                capacity: self.config.cache_capacity,
                len: cache.len(),
                enabled: true,
            }
        } else {
            CacheStats {
                capacity: 0,
                len: 0,
                enabled: false,
            }
        }
    }

    /// Get the current generation (incremented on each reload).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Get a reference to the underlying database.
    ///
    /// Note: This is primarily for inspection/debugging. The returned
    /// Arc may become stale after a hot reload.
    pub fn inner(&self) -> arc_swap::Guard<Arc<Database<S>>> {
        self.inner.load()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Maximum cache capacity.
    pub capacity: usize,
    /// Current number of entries in the cache.
    pub len: usize,
    /// Whether caching is enabled.
    pub enabled: bool,
}
