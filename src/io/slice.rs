use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::Status;
use crate::io::{Io, Whence};

/// A zero-copy, read-only stream over a borrowed byte slice — the fast
/// path for callers who already hold the whole file in memory and want to
/// decode without an extra copy.
pub struct SliceIo<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> SliceIo<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }
}

impl Io for SliceIo<'_> {
    fn strict_read(&mut self, buf: &mut [u8]) -> Result<(), Status> {
        self.cursor.read_exact(buf).map_err(Status::ReadIo)
    }

    fn tolerant_read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        self.cursor.read(buf).map_err(Status::ReadIo)
    }

    fn strict_write(&mut self, _buf: &[u8]) -> Result<(), Status> {
        Err(Status::InvalidArgument(
            "SliceIo is read-only".to_string(),
        ))
    }

    fn tolerant_write(&mut self, _buf: &[u8]) -> Result<usize, Status> {
        Err(Status::InvalidArgument(
            "SliceIo is read-only".to_string(),
        ))
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<(), Status> {
        let pos = match whence {
            Whence::Set => SeekFrom::Start(offset as u64),
            Whence::Cur => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.cursor.seek(pos).map(|_| ()).map_err(Status::SeekIo)
    }

    fn tell(&mut self) -> Result<u64, Status> {
        Ok(self.cursor.position())
    }

    fn flush(&mut self) -> Result<(), Status> {
        Ok(())
    }

    fn size(&mut self) -> Result<u64, Status> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}
