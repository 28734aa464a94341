//! Public error taxonomy.
//!
//! Expected conditions (a missing key, a CAS version conflict) are plain
//! error values the caller can match on and retry against (re-read, then
//! retry with the fresh version). Integrity and I/O failures abort the
//! operation, or all of [`Engine::new`](crate::Engine::new) when hit during
//! recovery, with no internal repair or retry.

use datafile::DataFileError;
use record::RecordError;
use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The key is absent or tombstoned.
    #[error("key not found")]
    NotFound,

    /// The requested CAS version does not match the stored one.
    #[error("version conflict: stored {stored}, requested {requested}")]
    VersionConflict { stored: i64, requested: i64 },

    /// The key exceeds [`MAX_KEY_SIZE`](crate::MAX_KEY_SIZE).
    #[error("key too large: {len} bytes (max {max})")]
    KeyTooLarge { len: usize, max: usize },

    /// The combined key + value payload exceeds
    /// [`MAX_RECORD_SIZE`](crate::MAX_RECORD_SIZE).
    #[error("record too large: {len} bytes (max {max})")]
    RecordTooLarge { len: usize, max: usize },

    /// A structurally invalid argument, e.g. an empty key.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The wall clock did not advance past the key's stored stamp; record
    /// ordering across restarts depends on it, so the write is refused.
    #[error("clock regression: new record stamp is not newer than the stored one")]
    ClockRegression,

    /// The index and the data files disagree.
    #[error("storage corruption: {0}")]
    Corrupt(&'static str),

    /// A record-level decode, CRC, or size failure.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A file-layout, rotation, or handle failure.
    #[error(transparent)]
    File(#[from] DataFileError),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
