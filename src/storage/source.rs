use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::Path,
};

use crate::types::error::{DatabaseError, Result};

/// Random-access byte reader the page layer is built on.
pub trait ByteSource: Send {
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Reads up to `buf.len()` bytes at the current position. Returns 0 at
    /// end of input.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn length(&self) -> Result<u64>;

    fn close(&mut self) -> Result<()>;

    /// Fills `buf` completely or fails with `UnexpectedEof`.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(DatabaseError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("short read: wanted {} bytes, got {}", buf.len(), filled),
                )));
            }
            filled += n;
        }
        Ok(())
    }
}

pub struct FileSource {
    file: Option<File>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::OpenOptions::new().read(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Some(file),
            len,
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(DatabaseError::Closed)
    }
}

impl ByteSource for FileSource {
    fn seek(&mut self, offset: u64) -> Result<()> {
        self.file()?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file()?;
        loop {
            match file.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn length(&self) -> Result<u64> {
        Ok(self.len)
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}

pub struct MemorySource {
    bytes: Vec<u8>,
    position: usize,
    closed: bool,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            position: 0,
            closed: false,
        }
    }
}

impl ByteSource for MemorySource {
    fn seek(&mut self, offset: u64) -> Result<()> {
        if self.closed {
            return Err(DatabaseError::Closed);
        }
        self.position = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(DatabaseError::Closed);
        }
        let remaining = self.bytes.get(self.position..).unwrap_or(&[]);
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn length(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.bytes = Vec::new();
        Ok(())
    }
}
