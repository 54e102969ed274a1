//! Seekable byte sources.
//!
//! Every stage of the pipeline reads through [`Source`]: sequential reads and
//! seeks come from `Read + Seek`, absolute-offset reads from
//! [`Source::read_at`], and the optional total length from [`Source::size`].
//! Stages that need a known length call [`sized`], which falls back to fully
//! buffering sources that cannot report one.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};

/// A readable, seekable byte source that may know its total length.
pub trait Source: Read + Seek {
    /// Read into `buf` starting at absolute `offset` without moving the cursor.
    ///
    /// Returns the number of bytes read, `0` at or past the end.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let pos = self.stream_position()?;
        self.seek(SeekFrom::Start(offset))?;
        let res = self.read(buf);
        self.seek(SeekFrom::Start(pos))?;
        res
    }

    /// Total length in bytes, if this source can report it.
    fn size(&self) -> Option<u64> {
        None
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

/// Only regular files report a size; pipes and character devices are
/// buffered like any other unsized stream.
impl Source for File {
    fn size(&self) -> Option<u64> {
        self.metadata().ok().filter(|m| m.is_file()).map(|m| m.len())
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(copy_at(AsRef::<[u8]>::as_ref(self.get_ref()), buf, offset))
    }

    fn size(&self) -> Option<u64> {
        Some(AsRef::<[u8]>::as_ref(self.get_ref()).len() as u64)
    }
}

/// Buffered readers hide the length of what they wrap.
impl<R: Read + Seek> Source for BufReader<R> {}

fn copy_at(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// Fill `buf` from absolute `offset`, failing with `UnexpectedEof` if the
/// source ends first.
pub fn read_exact_at<S: Source + ?Sized>(source: &mut S, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        match source.read_at(buf, offset) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
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

/// An owned in-memory source. Always sized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySource {
    inner: Cursor<Vec<u8>>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl Read for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for MemorySource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Source for MemorySource {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.inner.read_at(buf, offset)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

/// A source whose length is known, either natively or after buffering.
pub enum SizedSource<'a> {
    /// The caller's source already reports a length.
    Native { inner: &'a mut dyn Source, len: u64 },
    /// The caller's source was read to exhaustion into memory.
    Buffered(MemorySource),
}

impl SizedSource<'_> {
    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            SizedSource::Native { len, .. } => *len,
            SizedSource::Buffered(mem) => mem.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, SizedSource::Buffered(_))
    }

    /// Copy out every byte of the source without moving its cursor.
    pub fn to_bytes(&mut self) -> io::Result<Vec<u8>> {
        if let SizedSource::Buffered(mem) = self {
            return Ok(mem.as_bytes().to_vec());
        }
        let len = usize::try_from(self.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "source too large to buffer"))?;
        let mut data = vec![0; len];
        read_exact_at(self, &mut data, 0)?;
        Ok(data)
    }
}

impl Read for SizedSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SizedSource::Native { inner, .. } => inner.read(buf),
            SizedSource::Buffered(mem) => mem.read(buf),
        }
    }
}

impl Seek for SizedSource<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SizedSource::Native { inner, .. } => inner.seek(pos),
            SizedSource::Buffered(mem) => mem.seek(pos),
        }
    }
}

impl Source for SizedSource<'_> {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        match self {
            SizedSource::Native { inner, .. } => inner.read_at(buf, offset),
            SizedSource::Buffered(mem) => mem.read_at(buf, offset),
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.len())
    }
}

/// Return `source` as a sized source.
///
/// Sources that report a length are used in place. Anything else is read
/// from its current position to exhaustion and wrapped in memory; an I/O
/// error while doing so aborts with no partial result.
pub fn sized(source: &mut dyn Source) -> io::Result<SizedSource<'_>> {
    match source.size() {
        Some(len) => Ok(SizedSource::Native { inner: source, len }),
        None => {
            let mut data = Vec::new();
            source.read_to_end(&mut data)?;
            tracing::debug!(bytes = data.len(), "buffered unsized source");
            Ok(SizedSource::Buffered(MemorySource::new(data)))
        }
    }
}
