//! Error types shared by every codec, cipher and the pipeline driver.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a codec, cipher, pipeline stage or the file driver can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameters: empty key, unknown algorithm selector, bad argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An output buffer could not be allocated.
    #[error("Memory allocation failed: {0}")]
    Memory(String),

    /// A compression or decompression stage failed.
    #[error("Compression failed: {0}")]
    Compression(String),

    /// An encryption or decryption stage failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// A worker pool could not be started.
    #[error("Thread pool error: {0}")]
    Thread(String),

    /// The container is malformed: truncated, bad back-reference, bad code, bad bitstream.
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Args,
    Io,
    Memory,
    Compression,
    Encryption,
    Thread,
    Corrupt,
}

impl ErrorKind {
    /// Status code reported for a file that failed with this kind of error.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Args => -1,
            ErrorKind::Io => -2,
            ErrorKind::Memory => -3,
            ErrorKind::Compression => -4,
            ErrorKind::Encryption => -5,
            ErrorKind::Thread => -6,
            ErrorKind::Corrupt => -7,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::Args,
            Error::Memory(_) => ErrorKind::Memory,
            Error::Compression(_) => ErrorKind::Compression,
            Error::Encryption(_) => ErrorKind::Encryption,
            Error::Thread(_) => ErrorKind::Thread,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Error::Memory(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_exit_codes() {
        assert_eq!(Error::InvalidInput("x".into()).kind(), ErrorKind::Args);
        assert_eq!(Error::Corrupt("x".into()).kind(), ErrorKind::Corrupt);
        assert_eq!(ErrorKind::Args.exit_code(), -1);
        assert_eq!(ErrorKind::Encryption.exit_code(), -5);
    }

    #[test]
    fn test_io_error_message_names_path() {
        let err = Error::io(
            "/tmp/missing.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/tmp/missing.bin"));
    }

    #[test]
    fn test_try_reserve_maps_to_memory() {
        let mut v: Vec<u8> = Vec::new();
        let err: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Memory);
    }
}
