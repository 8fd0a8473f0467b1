//! QQWry - IPv4 location lookup over `qqwry.dat` databases.
//!
//! This crate resolves an IPv4 address to the two location fields
//! ("country" and "area") stored in a QQWry database: a small header, a
//! sorted fixed-stride index of range starts, and a record area that
//! deduplicates strings through redirect pointers.
//!
//! # Features
//!
//! - **Floor search**: O(log n) lookup of the range containing an address
//! - **Bounded redirects**: corrupt or cyclic files fail cleanly
//! - **Positioned reads**: mmap, pread or in-memory sources, no shared cursor
//! - **Thread-safe**: one opened database serves concurrent lookups
//! - **Hot reload**: [`CachedDatabase`] swaps files atomically behind an LRU cache
//!
//! # Quick Start
//!
//! ```ignore
//! use qqwry::{resolve, text};
//! use std::path::Path;
//!
//! let (country, area) = resolve(Path::new("qqwry.dat"), "1.2.3.4")?;
//! let (country, area) = text::display_fields(&country, &area, true, true);
//! println!("{}", text::format_location(&country, &area));
//! ```
//!
//! Fields come back as raw bytes; published files encode them in GBK, see
//! [`text`] for decoding helpers.
//!
//! # Long-running Services
//!
//! Open once and share:
//!
//! ```ignore
//! use qqwry::CachedDatabase;
//! use std::path::Path;
//!
//! let db = CachedDatabase::open(Path::new("qqwry.dat"))?;
//! let location = db.lookup_str("8.8.8.8")?;
//! db.reload(Path::new("qqwry-new.dat"))?;
//! ```

mod config;
mod error;
mod global;

pub mod binary;
pub mod text;

use std::path::Path;

// Re-export core types
pub use config::{CachedDatabaseConfig, DatabaseConfig, SourceMode};
pub use error::{Error, Error as LookupError, Result};

// Re-export engine types
pub use binary::{
    parse_ipv4, ByteSource, CacheStats, CachedDatabase, Database, DatabaseInfo, Location,
};

// Re-export global API functions
pub use global::{
    init_database, init_database_from_bytes, init_database_with_config, is_initialized, lookup,
    lookup_str, reload_database,
};

/// Resolve `ip_text` against the database at `database_path`.
///
/// Returns the raw `(country, area)` bytes. The address is parsed before the
/// file is touched, so bad input fails with `InvalidAddress` even when the
/// path is wrong.
pub fn resolve(database_path: &Path, ip_text: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let ip = parse_ipv4(ip_text)?;
    // A single lookup touches ~log2(n) entries; skip copying the index.
    let config = DatabaseConfig {
        preload_index: false,
        ..DatabaseConfig::default()
    };
    let db = Database::open_with_config(database_path, &config)?;
    db.resolve(ip)
}
