//! Byte sources handed to the database engine.
//!
//! An operator-supplied database is memory-mapped from disk. An embedded
//! database lives in a [`MemoryFile`], which offers the same random-access
//! contract as a file so no temporary file is ever written.
//!
//! [`MaxMindEngine`](crate::MaxMindEngine) consumes the `AsRef<[u8]>` view of
//! a [`DatabaseSource`]; [`ReadAt`] is the positional-read contract for
//! engines that read by offset.

use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Positional reads over a fixed-length byte source.
pub trait ReadAt {
    /// Read into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes copied. A read that crosses the end of
    /// the source is short; a read at or beyond the end returns `Ok(0)`.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Release the source. Sources that hold no external resource always succeed.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

fn read_slice_at(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    let start = match usize::try_from(offset) {
        Ok(start) if start < data.len() => start,
        _ => return 0,
    };

    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// In-memory stand-in for a seekable database file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFile {
    data: Vec<u8>,
}

impl MemoryFile {
    /// Wrap a decompressed buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ReadAt for MemoryFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(read_slice_at(&self.data, buf, offset))
    }
}

impl AsRef<[u8]> for MemoryFile {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Where an opened database's bytes come from.
#[derive(Debug)]
pub enum DatabaseSource {
    /// Memory-mapped file from disk
    Mapped(Mmap),
    /// Embedded asset decompressed into memory
    Memory(MemoryFile),
}

impl DatabaseSource {
    /// Memory-map a database file.
    ///
    /// Errors keep their original [`io::ErrorKind`], so a missing file
    /// surfaces as `NotFound`.
    pub fn map(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        // The file is treated as read-only for the lifetime of the process.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(DatabaseSource::Mapped(mmap))
    }

    /// Check if the bytes come from an embedded asset.
    pub fn is_embedded(&self) -> bool {
        matches!(self, DatabaseSource::Memory(_))
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Check if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadAt for DatabaseSource {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(read_slice_at(self.as_ref(), buf, offset))
    }
}

impl AsRef<[u8]> for DatabaseSource {
    fn as_ref(&self) -> &[u8] {
        match self {
            DatabaseSource::Mapped(mmap) => &mmap[..],
            DatabaseSource::Memory(file) => file.as_ref(),
        }
    }
}

impl From<MemoryFile> for DatabaseSource {
    fn from(file: MemoryFile) -> Self {
        DatabaseSource::Memory(file)
    }
}
