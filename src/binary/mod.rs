//! QQWry on-disk format and lookup engine.
//!
//! The file is a header, a record area and a sorted fixed-stride index:
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |     HEADER       |  8 bytes: index_start u32, index_end u32 (LE)
//! +------------------+
//! |     RECORDS      |  variable: [ip u32][country][area], with redirects
//! +------------------+
//! |      INDEX       |  7-byte entries: [ip u32][record_ptr u24], sorted by ip
//! +------------------+
//! ```
//!
//! A lookup floor-searches the index for the range holding the address,
//! then decodes the two text fields of the record it points to.

mod cached_reader;
mod format;
pub mod index;
mod reader;
pub mod record;
pub mod source;

#[cfg(test)]
pub(crate) mod fixture;

pub use cached_reader::{CacheStats, CachedDatabase};
pub use format::*;
pub use index::{find_floor, find_record_offset, IndexEntries, LoadedIndex, SourceIndex};
pub use reader::{parse_ipv4, Database, DatabaseInfo, Location};
pub use record::{FieldOutcome, RecordResolver};
pub use source::{ByteSource, DynSource, FileSource, MmapSource};
