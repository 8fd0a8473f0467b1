//! Random-access byte sources backing a database.
//!
//! Every read carries an explicit offset, so a source holds no cursor and
//! one instance can serve concurrent lookups.

use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

use super::format::{HEADER_SIZE, OFFSET_SIZE};
use crate::{Error, Result};

/// Bytes scanned per step when looking for a string terminator.
const SCAN_CHUNK: usize = 64;

/// Positioned, read-only access to a database file.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fill `buf` from `offset`. Fails with `Io(UnexpectedEof)` on a short read.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// True when the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `len` bytes at `offset` into a fresh buffer.
    fn read_vec(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read one byte.
    fn read_u8(&self, offset: u64) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_at(offset, &mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian 24-bit integer.
    fn read_u24_le(&self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; OFFSET_SIZE];
        self.read_at(offset, &mut buf)?;
        Ok(super::format::u24_le(buf))
    }

    /// Read a little-endian 32-bit integer.
    fn read_u32_le(&self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_at(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read bytes from `offset` up to (excluding) the next NUL.
    ///
    /// Returns `None` when no NUL occurs within `max_len` bytes or before
    /// the end of the source.
    fn read_until_nul(&self, offset: u64, max_len: usize) -> Result<Option<Vec<u8>>> {
        let mut out = Vec::new();
        let mut pos = offset;
        let mut chunk = [0u8; SCAN_CHUNK];

        while pos < self.len() && out.len() <= max_len {
            let take = (self.len() - pos).min(SCAN_CHUNK as u64) as usize;
            self.read_at(pos, &mut chunk[..take])?;
            if let Some(nul) = chunk[..take].iter().position(|&b| b == 0) {
                out.extend_from_slice(&chunk[..nul]);
                return Ok((out.len() <= max_len).then_some(out));
            }
            out.extend_from_slice(&chunk[..take]);
            pos += take as u64;
        }

        Ok(None)
    }
}

fn short_read(offset: u64, len: usize, total: u64) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!(
            "read of {} bytes at {:#x} exceeds source length {}",
            len, offset, total
        ),
    ))
}

fn read_slice(data: &[u8], offset: u64, buf: &mut [u8]) -> Result<()> {
    let start = usize::try_from(offset)
        .map_err(|_| short_read(offset, buf.len(), data.len() as u64))?;
    let end = start
        .checked_add(buf.len())
        .filter(|&end| end <= data.len())
        .ok_or_else(|| short_read(offset, buf.len(), data.len() as u64))?;
    buf.copy_from_slice(&data[start..end]);
    Ok(())
}

fn scan_slice(data: &[u8], offset: u64, max_len: usize) -> Option<Vec<u8>> {
    let start = usize::try_from(offset).ok().filter(|&s| s <= data.len())?;
    let window = &data[start..data.len().min(start.saturating_add(max_len + 1))];
    let nul = window.iter().position(|&b| b == 0)?;
    Some(window[..nul].to_vec())
}

/// Open a file and reject anything too short to hold a header.
fn open_checked(path: &Path) -> Result<(File, u64)> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len < HEADER_SIZE as u64 {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{} is {} bytes, shorter than the {}-byte header",
                path.display(),
                len,
                HEADER_SIZE
            ),
        )));
    }
    Ok((file, len))
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_slice(self, offset, buf)
    }

    fn read_until_nul(&self, offset: u64, max_len: usize) -> Result<Option<Vec<u8>>> {
        Ok(scan_slice(self, offset, max_len))
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_slice(self, offset, buf)
    }

    fn read_until_nul(&self, offset: u64, max_len: usize) -> Result<Option<Vec<u8>>> {
        Ok(scan_slice(self, offset, max_len))
    }
}

/// Memory-mapped database file.
pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    /// Map a database file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let (file, _) = open_checked(path)?;
        // SAFETY: the mapping is read-only; the file is expected not to be
        // truncated while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }
}

impl ByteSource for MmapSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_slice(&self.mmap, offset, buf)
    }

    fn read_until_nul(&self, offset: u64, max_len: usize) -> Result<Option<Vec<u8>>> {
        Ok(scan_slice(&self.mmap, offset, max_len))
    }
}

/// Database file read with positioned (pread-style) reads.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Open a database file for positioned reads.
    pub fn open(path: &Path) -> Result<Self> {
        let (file, len) = open_checked(path)?;
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let in_bounds = offset
            .checked_add(buf.len() as u64)
            .is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(short_read(offset, buf.len(), self.len));
        }
        pread_exact(&self.file, buf, offset)?;
        Ok(())
    }
}

#[cfg(unix)]
fn pread_exact(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn pread_exact(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Source chosen at runtime from [`crate::SourceMode`].
pub enum DynSource {
    /// Memory-mapped file
    Mmap(MmapSource),
    /// Positioned reads on an open file
    File(FileSource),
    /// Whole file held in memory
    Memory(Vec<u8>),
}

impl DynSource {
    /// Open `path` using the given access mode.
    pub fn open(path: &Path, mode: crate::SourceMode) -> Result<Self> {
        use crate::SourceMode;

        Ok(match mode {
            SourceMode::Mmap => DynSource::Mmap(MmapSource::open(path)?),
            SourceMode::File => DynSource::File(FileSource::open(path)?),
            SourceMode::Memory => {
                use std::io::Read;

                let (mut file, len) = open_checked(path)?;
                let mut data = Vec::with_capacity(len as usize);
                file.read_to_end(&mut data)?;
                DynSource::Memory(data)
            }
        })
    }
}

impl ByteSource for DynSource {
    fn len(&self) -> u64 {
        match self {
            DynSource::Mmap(s) => s.len(),
            DynSource::File(s) => s.len(),
            DynSource::Memory(s) => ByteSource::len(s),
        }
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            DynSource::Mmap(s) => s.read_at(offset, buf),
            DynSource::File(s) => s.read_at(offset, buf),
            DynSource::Memory(s) => s.read_at(offset, buf),
        }
    }

    fn read_until_nul(&self, offset: u64, max_len: usize) -> Result<Option<Vec<u8>>> {
        match self {
            DynSource::Mmap(s) => s.read_until_nul(offset, max_len),
            DynSource::File(s) => s.read_until_nul(offset, max_len),
            DynSource::Memory(s) => s.read_until_nul(offset, max_len),
        }
    }
}
