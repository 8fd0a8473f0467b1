//! QQWry format constants and structures.

use crate::{Error, Result};

/// Header size in bytes: `index_start: u32` + `index_end: u32`, both LE.
pub const HEADER_SIZE: usize = 8;

/// Size of one index entry: 4-byte IP + 3-byte record pointer.
pub const INDEX_ENTRY_SIZE: usize = 7;

/// Size of a stored offset (record pointer or redirect target).
pub const OFFSET_SIZE: usize = 3;

/// Size of the range IP stored at the start of each record.
pub const RECORD_IP_SIZE: usize = 4;

/// Tag byte: the rest of the record lives at the following offset.
pub const REDIRECT_MODE_FULL: u8 = 0x01;

/// Tag byte: only this field lives at the following offset.
pub const REDIRECT_MODE_FIELD: u8 = 0x02;

/// Default cap on chained redirects within one field.
pub const DEFAULT_MAX_REDIRECT_DEPTH: u32 = 32;

/// Longest location string accepted before the file is considered corrupt.
pub const MAX_STRING_LEN: usize = 4096;

/// Database header (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Absolute offset of the first index entry
    pub index_start: u32,
    /// Absolute offset of the last index entry (inclusive)
    pub index_end: u32,
}

impl Header {
    /// Decode the header from its on-disk bytes.
    pub fn parse(data: &[u8; HEADER_SIZE]) -> Self {
        Self {
            index_start: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            index_end: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        }
    }

    /// Check ordering, alignment and that the index fits in a file of `file_len` bytes.
    pub fn validate(&self, file_len: u64) -> Result<()> {
        if self.index_end < self.index_start {
            return Err(Error::malformed(format!(
                "index end {:#x} precedes index start {:#x}",
                self.index_end, self.index_start
            )));
        }
        if (self.index_end - self.index_start) as usize % INDEX_ENTRY_SIZE != 0 {
            return Err(Error::malformed(format!(
                "index region size {} is not a multiple of {}",
                self.index_end - self.index_start,
                INDEX_ENTRY_SIZE
            )));
        }
        if (self.index_start as usize) < HEADER_SIZE {
            return Err(Error::malformed(format!(
                "index start {:#x} overlaps the header",
                self.index_start
            )));
        }
        let index_tail = self.index_end as u64 + INDEX_ENTRY_SIZE as u64;
        if index_tail > file_len {
            return Err(Error::malformed(format!(
                "index region ends at {:#x} but file is {} bytes",
                index_tail, file_len
            )));
        }
        Ok(())
    }

    /// Number of index entries.
    pub fn entry_count(&self) -> u32 {
        (self.index_end - self.index_start) / INDEX_ENTRY_SIZE as u32 + 1
    }

    /// Absolute offset of the `i`-th index entry.
    pub fn entry_offset(&self, i: u32) -> u64 {
        self.index_start as u64 + i as u64 * INDEX_ENTRY_SIZE as u64
    }

    /// Size of the index region in bytes.
    pub fn index_len(&self) -> usize {
        (self.index_end - self.index_start) as usize + INDEX_ENTRY_SIZE
    }
}

/// Index entry (7 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexEntry {
    /// First IP of the range (host order)
    pub ip: u32,
    /// Offset of the record describing the range
    pub record_ptr: u32,
}

impl IndexEntry {
    /// Decode an entry from its on-disk bytes.
    pub fn parse(data: &[u8; INDEX_ENTRY_SIZE]) -> Self {
        Self {
            ip: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            record_ptr: u24_le([data[4], data[5], data[6]]),
        }
    }
}

/// Decoded tag byte at the start of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    /// `0x01`: the remaining record moved
    FullRedirect,
    /// `0x02`: this field alone moved
    FieldRedirect,
    /// First byte of an inline NUL-terminated string (may be the NUL itself)
    Literal(u8),
}

impl FieldTag {
    /// Classify a tag byte.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            REDIRECT_MODE_FULL => FieldTag::FullRedirect,
            REDIRECT_MODE_FIELD => FieldTag::FieldRedirect,
            other => FieldTag::Literal(other),
        }
    }
}

/// Little-endian 24-bit integer.
pub fn u24_le(b: [u8; OFFSET_SIZE]) -> u32 {
    b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16
}
