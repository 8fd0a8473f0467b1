//! Database handle tying header, index search and record decoding together.

use serde::Serialize;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;

use super::format::{Header, IndexEntry, HEADER_SIZE};
use super::index::{find_floor, LoadedIndex, SourceIndex};
use super::record::RecordResolver;
use super::source::{ByteSource, DynSource};
use crate::{DatabaseConfig, Error, Result};

/// Resolved location for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// First address of the range containing the query
    pub range_start: Ipv4Addr,
    /// Country field, raw bytes (GBK in published files)
    pub country: Vec<u8>,
    /// Area field, raw bytes; often empty
    pub area: Vec<u8>,
}

impl Location {
    /// Split into `(country, area)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.country, self.area)
    }
}

/// Summary of an opened database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    /// File length in bytes
    pub file_size: u64,
    /// Offset of the first index entry
    pub index_start: u32,
    /// Offset of the last index entry
    pub index_end: u32,
    /// Number of index entries
    pub entry_count: u32,
    /// Lowest indexed address
    pub first_ip: Ipv4Addr,
    /// Highest indexed address
    pub last_ip: Ipv4Addr,
}

/// An opened QQWry database.
///
/// All reads are positioned, so a `Database` can be shared between threads
/// and queried concurrently.
///
/// # Example
///
/// ```ignore
/// use qqwry::Database;
/// use std::path::Path;
///
/// let db = Database::open(Path::new("qqwry.dat"))?;
/// let location = db.lookup_str("1.2.3.4")?;
/// println!("{}", qqwry::text::format_location(&location.country, &location.area));
/// ```
pub struct Database<S: ByteSource = DynSource> {
    source: S,
    header: Header,
    index: Option<LoadedIndex>,
    max_redirect_depth: u32,
}

impl Database<DynSource> {
    /// Open a database file with default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, &DatabaseConfig::default())
    }

    /// Open a database file with custom configuration.
    pub fn open_with_config(path: &Path, config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let source = DynSource::open(path, config.source)?;
        let db = Self::from_source(source, config)?;

        log::info!(
            "Opened QQWry database {:?}: {} entries ({:?} access)",
            path,
            db.entry_count(),
            config.source
        );
        Ok(db)
    }
}

impl Database<Vec<u8>> {
    /// Use an in-memory copy of a database file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_source(data, &DatabaseConfig::default())
    }
}

impl<S: ByteSource> Database<S> {
    /// Wrap an arbitrary byte source, reading and validating its header.
    pub fn from_source(source: S, config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        if source.len() < HEADER_SIZE as u64 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "database is {} bytes, shorter than the {}-byte header",
                    source.len(),
                    HEADER_SIZE
                ),
            )));
        }

        let mut raw = [0u8; HEADER_SIZE];
        source.read_at(0, &mut raw)?;
        let header = Header::parse(&raw);
        header.validate(source.len())?;

        let index = if config.preload_index {
            Some(LoadedIndex::load(&source, &header)?)
        } else {
            None
        };

        Ok(Self {
            source,
            header,
            index,
            max_redirect_depth: config.max_redirect_depth,
        })
    }

    /// The validated header.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Number of index entries.
    pub fn entry_count(&self) -> u32 {
        self.header.entry_count()
    }

    /// The underlying byte source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Floor entry for `ip`, from the preloaded index when available.
    fn floor_entry(&self, ip: u32) -> Result<Option<(u32, IndexEntry)>> {
        match &self.index {
            Some(index) => find_floor(index, ip),
            None => find_floor(&SourceIndex::new(&self.source, self.header), ip),
        }
    }

    fn resolver(&self) -> RecordResolver<'_, S> {
        RecordResolver::with_max_depth(&self.source, self.max_redirect_depth)
    }

    /// Record pointer for the range containing `ip`.
    pub fn find_record_offset(&self, ip: Ipv4Addr) -> Result<u32> {
        self.floor_entry(u32::from(ip))?
            .map(|(_, entry)| entry.record_ptr)
            .ok_or(Error::NotFound(ip))
    }

    /// Decode `(country, area)` of the record at `record_ptr`.
    pub fn read_record(&self, record_ptr: u32) -> Result<(Vec<u8>, Vec<u8>)> {
        self.resolver().read_record(record_ptr)
    }

    /// Look up an address.
    pub fn lookup(&self, ip: Ipv4Addr) -> Result<Location> {
        let (_, entry) = self.floor_entry(u32::from(ip))?.ok_or(Error::NotFound(ip))?;
        let (country, area) = self.read_record(entry.record_ptr)?;

        log::debug!(
            "{} -> range {} record {:#x} ({} + {} bytes)",
            ip,
            Ipv4Addr::from(entry.ip),
            entry.record_ptr,
            country.len(),
            area.len()
        );

        Ok(Location {
            range_start: Ipv4Addr::from(entry.ip),
            country,
            area,
        })
    }

    /// Parse `ip_text` and look it up.
    pub fn lookup_str(&self, ip_text: &str) -> Result<Location> {
        self.lookup(parse_ipv4(ip_text)?)
    }

    /// Look up an address, returning only `(country, area)`.
    pub fn resolve(&self, ip: Ipv4Addr) -> Result<(Vec<u8>, Vec<u8>)> {
        self.lookup(ip).map(Location::into_parts)
    }

    /// Location stored for the last index entry.
    ///
    /// Published QQWry files keep their release label here.
    pub fn version(&self) -> Result<Location> {
        let last = self.last_entry()?;
        let (country, area) = self.read_record(last.record_ptr)?;
        Ok(Location {
            range_start: Ipv4Addr::from(last.ip),
            country,
            area,
        })
    }

    /// Summary of this database.
    pub fn info(&self) -> Result<DatabaseInfo> {
        let first = self.entry_at(0)?;
        let last = self.last_entry()?;
        Ok(DatabaseInfo {
            file_size: self.source.len(),
            index_start: self.header.index_start,
            index_end: self.header.index_end,
            entry_count: self.entry_count(),
            first_ip: Ipv4Addr::from(first.ip),
            last_ip: Ipv4Addr::from(last.ip),
        })
    }

    fn last_entry(&self) -> Result<IndexEntry> {
        self.entry_at(self.entry_count() - 1)
    }

    fn entry_at(&self, i: u32) -> Result<IndexEntry> {
        use super::index::IndexEntries;

        match &self.index {
            Some(index) => index.entry(i),
            None => SourceIndex::new(&self.source, self.header).entry(i),
        }
    }
}

/// Parse dotted-quad IPv4 text, ignoring surrounding whitespace.
pub fn parse_ipv4(ip_text: &str) -> Result<Ipv4Addr> {
    ip_text
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| Error::InvalidAddress(ip_text.to_string()))
}
