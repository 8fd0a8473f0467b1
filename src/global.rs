//! Process-wide default database and convenience API.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use crate::binary::{CachedDatabase, Database, DynSource, Location};
use crate::error::{Error, Result};
use crate::{CachedDatabaseConfig, DatabaseConfig};

/// Global database
static GLOBAL_DATABASE: Lazy<RwLock<Option<Arc<CachedDatabase>>>> =
    Lazy::new(|| RwLock::new(None));

fn install(db: CachedDatabase) {
    let mut guard = GLOBAL_DATABASE.write();
    if guard.is_some() {
        log::warn!("Replacing previously initialized global database");
    }
    *guard = Some(Arc::new(db));
}

fn current() -> Result<Arc<CachedDatabase>> {
    GLOBAL_DATABASE
        .read()
        .as_ref()
        .cloned()
        .ok_or(Error::NotInitialized)
}

/// Initialize the global database from a file path.
///
/// Calling this again replaces the previous database.
pub fn init_database(path: &Path) -> Result<()> {
    init_database_with_config(
        path,
        DatabaseConfig::default(),
        CachedDatabaseConfig::default(),
    )
}

/// Initialize the global database with explicit configuration.
pub fn init_database_with_config(
    path: &Path,
    db_config: DatabaseConfig,
    cache_config: CachedDatabaseConfig,
) -> Result<()> {
    let db = CachedDatabase::open_with_config(path, db_config, cache_config)?;
    install(db);
    Ok(())
}

/// Initialize the global database from an in-memory file image.
pub fn init_database_from_bytes(data: Vec<u8>) -> Result<()> {
    let db_config = DatabaseConfig::default();
    let db = Database::from_source(DynSource::Memory(data), &db_config)?;
    install(CachedDatabase::new(
        db,
        db_config,
        CachedDatabaseConfig::default(),
    ));
    Ok(())
}

/// Hot reload the global database from a new file.
pub fn reload_database(path: &Path) -> Result<()> {
    current()?.reload(path)
}

/// Check if the global database is initialized.
pub fn is_initialized() -> bool {
    GLOBAL_DATABASE.read().is_some()
}

/// Look up an address in the global database.
///
/// # Examples
/// ```ignore
/// use qqwry::{init_database, lookup};
/// use std::path::Path;
///
/// init_database(Path::new("qqwry.dat"))?;
/// let location = lookup("1.2.3.4".parse()?)?;
/// ```
pub fn lookup(ip: Ipv4Addr) -> Result<Arc<Location>> {
    current()?.lookup(ip)
}

/// Parse `ip_text` and look it up in the global database.
pub fn lookup_str(ip_text: &str) -> Result<Arc<Location>> {
    current()?.lookup_str(ip_text)
}
