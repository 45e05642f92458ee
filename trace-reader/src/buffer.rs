//! Immutable in-memory copy of a trace file

use crate::error::{LoadError, ReaderError};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Raw trace bytes, loaded once
///
/// The length is fixed at construction; nothing is ever appended or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBuffer {
    bytes: Box<[u8]>,
}

impl TraceBuffer {
    /// Read a whole trace file into memory
    ///
    /// The file size is measured up front and the buffer is filled in one
    /// pass; a file that yields fewer bytes than its reported size is a
    /// [`LoadError::ReadFailure`]. The handle is closed before returning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::CannotOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let read_failure = |source| LoadError::ReadFailure {
            path: path.to_path_buf(),
            source,
        };

        let size = file.metadata().map_err(read_failure)?.len();
        let mut bytes = Vec::with_capacity(size as usize);
        let read = file
            .take(size)
            .read_to_end(&mut bytes)
            .map_err(read_failure)?;

        if (read as u64) < size {
            return Err(read_failure(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, read {}", size, read),
            )));
        }

        tracing::info!("Loaded trace {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw byte at `offset`
    pub fn byte(&self, offset: u64) -> Result<u8, ReaderError> {
        self.index(offset).map(|i| self.bytes[i])
    }

    /// Up to `count` bytes starting at `offset`, clamped to the end of the trace
    pub fn slice(&self, offset: u64, count: u64) -> Result<&[u8], ReaderError> {
        let start = self.index(offset)?;
        let available = self.bytes.len() - start;
        let end = start + usize::try_from(count).map_or(available, |c| c.min(available));
        Ok(&self.bytes[start..end])
    }

    fn index(&self, offset: u64) -> Result<usize, ReaderError> {
        if offset < self.len() {
            Ok(offset as usize)
        } else {
            Err(ReaderError::OutOfBounds {
                offset,
                len: self.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_reads_whole_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[5, 254, 9, 0]).unwrap();
        file.flush().unwrap();

        let buffer = TraceBuffer::load(file.path()).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.as_bytes(), &[5, 254, 9, 0]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TraceBuffer::load(dir.path().join("missing.log"));
        assert!(matches!(result, Err(LoadError::CannotOpen { .. })));
    }

    #[test]
    fn test_load_directory_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = TraceBuffer::load(dir.path());
        assert!(matches!(result, Err(LoadError::ReadFailure { .. })));
    }

    #[test]
    fn test_load_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let buffer = TraceBuffer::load(file.path()).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_byte_is_bounds_checked() {
        let buffer = TraceBuffer::from_bytes(vec![1, 2, 3]);
        assert_eq!(buffer.byte(2).unwrap(), 3);
        assert!(matches!(
            buffer.byte(3),
            Err(ReaderError::OutOfBounds { offset: 3, len: 3 })
        ));
    }

    #[test]
    fn test_slice_is_clamped_to_end() {
        let buffer = TraceBuffer::from_bytes(vec![1, 2, 3, 4]);
        assert_eq!(buffer.slice(1, 2).unwrap(), &[2, 3]);
        assert_eq!(buffer.slice(2, 100).unwrap(), &[3, 4]);
        assert_eq!(buffer.slice(0, u64::MAX).unwrap(), &[1, 2, 3, 4]);
        assert!(buffer.slice(4, 1).is_err());
    }
}
