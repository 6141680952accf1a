//! Bridges this crate's [`Io`] trait to `std::io::{Read, Write, Seek}` for
//! the wrapper codecs that drive a third-party
//! crate expecting the standard traits.

use std::io;

use crate::io::{Io, Whence};

fn status_to_io_error(status: crate::error::Status) -> io::Error {
    io::Error::new(io::ErrorKind::Other, status.to_string())
}

pub struct IoAdapter<'a> {
    pub inner: &'a mut dyn Io,
}

impl<'a> IoAdapter<'a> {
    pub fn new(inner: &'a mut dyn Io) -> Self {
        Self { inner }
    }
}

impl io::Read for IoAdapter<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.tolerant_read(buf).map_err(status_to_io_error)
    }
}

impl io::Write for IoAdapter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.tolerant_write(buf).map_err(status_to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(status_to_io_error)
    }
}

impl io::Seek for IoAdapter<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => (n as i64, Whence::Set),
            io::SeekFrom::Current(n) => (n, Whence::Cur),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        self.inner.seek(offset, whence).map_err(status_to_io_error)?;
        self.inner.tell().map_err(status_to_io_error)
    }
}

/// Like [`IoAdapter`] but owns its [`Io`] instead of borrowing it — lets a
/// wrapper codec's `Reader`/`Writer` hold the stream for the whole session
/// without a self-referential struct.
pub struct OwnedIoAdapter<'io> {
    pub inner: Box<dyn Io + 'io>,
}

impl<'io> OwnedIoAdapter<'io> {
    pub fn new(inner: Box<dyn Io + 'io>) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> Box<dyn Io + 'io> {
        self.inner
    }
}

impl io::Read for OwnedIoAdapter<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.tolerant_read(buf).map_err(status_to_io_error)
    }
}

impl io::Write for OwnedIoAdapter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.tolerant_write(buf).map_err(status_to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(status_to_io_error)
    }
}

impl io::Seek for OwnedIoAdapter<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => (n as i64, Whence::Set),
            io::SeekFrom::Current(n) => (n, Whence::Cur),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        self.inner.seek(offset, whence).map_err(status_to_io_error)?;
        self.inner.tell().map_err(status_to_io_error)
    }
}
