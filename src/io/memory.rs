use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::error::Status;
use crate::io::{Io, Whence};

/// An owned, auto-growing in-memory stream: backs both a fixed preloaded
/// buffer and an empty buffer that grows on write, since `Vec<u8>` already
/// grows on write and one type serves both roles.
pub struct MemoryIo {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(Vec::new()),
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn get_ref(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Default for MemoryIo {
    fn default() -> Self {
        Self::new()
    }
}

impl Io for MemoryIo {
    fn strict_read(&mut self, buf: &mut [u8]) -> Result<(), Status> {
        self.cursor.read_exact(buf).map_err(Status::ReadIo)
    }

    fn tolerant_read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        self.cursor.read(buf).map_err(Status::ReadIo)
    }

    fn strict_write(&mut self, buf: &[u8]) -> Result<(), Status> {
        self.cursor.write_all(buf).map_err(Status::WriteIo)
    }

    fn tolerant_write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        self.cursor.write(buf).map_err(Status::WriteIo)
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
        self.cursor.flush().map_err(Status::FlushIo)
    }

    fn size(&mut self) -> Result<u64, Status> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}
