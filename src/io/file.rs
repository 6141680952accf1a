use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Status;
use crate::io::{Io, Whence};

/// A stream backed by an open `std::fs::File`.
pub struct FileIo {
    file: File,
}

impl FileIo {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Io for FileIo {
    fn strict_read(&mut self, buf: &mut [u8]) -> Result<(), Status> {
        self.file.read_exact(buf).map_err(Status::ReadIo)
    }

    fn tolerant_read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        self.file.read(buf).map_err(Status::ReadIo)
    }

    fn strict_write(&mut self, buf: &[u8]) -> Result<(), Status> {
        self.file.write_all(buf).map_err(Status::WriteIo)
    }

    fn tolerant_write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        self.file.write(buf).map_err(Status::WriteIo)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<(), Status> {
        let pos = match whence {
            Whence::Set => SeekFrom::Start(offset as u64),
            Whence::Cur => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.file.seek(pos).map(|_| ()).map_err(Status::SeekIo)
    }

    fn tell(&mut self) -> Result<u64, Status> {
        self.file.stream_position().map_err(Status::TellIo)
    }

    fn flush(&mut self) -> Result<(), Status> {
        self.file.flush().map_err(Status::FlushIo)
    }

    fn size(&mut self) -> Result<u64, Status> {
        let current = self.tell()?;
        let end = self.file.seek(SeekFrom::End(0)).map_err(Status::SeekIo)?;
        self.file
            .seek(SeekFrom::Start(current))
            .map_err(Status::SeekIo)?;
        Ok(end)
    }
}
