//! Floor search over the sorted index region.

use super::format::{Header, IndexEntry, INDEX_ENTRY_SIZE};
use super::source::ByteSource;
use crate::{Error, Result};

/// Random access to index entries by position.
pub trait IndexEntries {
    /// Number of entries.
    fn count(&self) -> u32;

    /// Entry at position `i` (`i < count()`).
    fn entry(&self, i: u32) -> Result<IndexEntry>;
}

/// Index read directly from the source on every probe.
pub struct SourceIndex<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    header: Header,
}

impl<'a, S: ByteSource + ?Sized> SourceIndex<'a, S> {
    /// Wrap a source whose header has already been validated.
    pub fn new(source: &'a S, header: Header) -> Self {
        Self { source, header }
    }
}

impl<S: ByteSource + ?Sized> IndexEntries for SourceIndex<'_, S> {
    fn count(&self) -> u32 {
        self.header.entry_count()
    }

    fn entry(&self, i: u32) -> Result<IndexEntry> {
        let mut buf = [0u8; INDEX_ENTRY_SIZE];
        self.source
            .read_at(self.header.entry_offset(i), &mut buf)
            .map_err(|e| Error::malformed(format!("index entry {} unreadable: {}", i, e)))?;
        Ok(IndexEntry::parse(&buf))
    }
}

/// Index region copied into memory once.
#[derive(Debug, Clone, Default)]
pub struct LoadedIndex {
    entries: Vec<IndexEntry>,
}

impl LoadedIndex {
    /// Copy the whole index region out of `source`.
    pub fn load<S: ByteSource + ?Sized>(source: &S, header: &Header) -> Result<Self> {
        let raw = source
            .read_vec(header.index_start as u64, header.index_len())
            .map_err(|e| Error::malformed(format!("index region unreadable: {}", e)))?;

        let entries = raw
            .chunks_exact(INDEX_ENTRY_SIZE)
            .map(|chunk| {
                let mut buf = [0u8; INDEX_ENTRY_SIZE];
                buf.copy_from_slice(chunk);
                IndexEntry::parse(&buf)
            })
            .collect();

        Ok(Self { entries })
    }

    /// Build from already-decoded entries.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// All entries, in file order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

impl IndexEntries for LoadedIndex {
    fn count(&self) -> u32 {
        self.entries.len() as u32
    }

    fn entry(&self, i: u32) -> Result<IndexEntry> {
        self.entries
            .get(i as usize)
            .copied()
            .ok_or_else(|| Error::malformed(format!("index entry {} out of range", i)))
    }
}

/// Find the last entry whose IP is `<= target`.
///
/// Returns the entry position and the entry itself, or `None` when the
/// target lies below the first entry (or the index is empty).
pub fn find_floor<I: IndexEntries + ?Sized>(
    index: &I,
    target: u32,
) -> Result<Option<(u32, IndexEntry)>> {
    let count = index.count();
    if count == 0 {
        return Ok(None);
    }

    let mut lo = 0u32;
    let mut hi = count - 1;

    // Invariant: every entry after `hi` is > target; `lo` is the floor if one exists.
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        let entry = index.entry(mid)?;
        log::trace!("index probe [{}] ip={:#010x} target={:#010x}", mid, entry.ip, target);
        if entry.ip <= target {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let entry = index.entry(lo)?;
    if entry.ip > target {
        return Ok(None);
    }
    Ok(Some((lo, entry)))
}

/// Map `target_ip` to the record pointer of its containing range.
///
/// Reads the index straight from `source`. Fails with `NotFound` when the
/// address is below database coverage.
pub fn find_record_offset<S: ByteSource + ?Sized>(
    source: &S,
    header: Header,
    target_ip: u32,
) -> Result<u32> {
    let index = SourceIndex::new(source, header);
    find_floor(&index, target_ip)?
        .map(|(_, entry)| entry.record_ptr)
        .ok_or_else(|| Error::NotFound(target_ip.into()))
}
