//! Error types for trace loading and inspection

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring a trace file into memory
///
/// Always fatal to the session: there is nothing to step through.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("can't open trace file {}: {source}", .path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't read trace file {} into buffer: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("offset {offset} is outside the trace ({len} bytes)")]
    OutOfBounds { offset: u64, len: u64 },
}
