//! Read path: `get()`.
//!
//! A point lookup is a KeyDir probe followed by a single seek + read in
//! the owning data file. Tombstoned keys answer not-found. The read path
//! never mutates the index.

use crate::{Engine, EngineError, Result};

impl Engine {
    /// Looks up a key, returning its value and current CAS version.
    ///
    /// The returned version is what a subsequent conditional
    /// [`put`](Engine::put) or [`del`](Engine::del) must present.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the key is absent or tombstoned;
    /// [`EngineError::Corrupt`] if the index points at a record the file
    /// no longer yields; record CRC and I/O errors otherwise.
    pub fn get(&self, key: &[u8]) -> Result<(Vec<u8>, i64)> {
        let bucket = self.index.get(key).ok_or(EngineError::NotFound)?;
        if !bucket.is_live() {
            return Err(EngineError::NotFound);
        }

        let file = self
            .files
            .file(&bucket.file)
            .ok_or(EngineError::Corrupt("owning data file not in open table"))?;
        let record = file
            .read_record_at(bucket.data_pos)?
            .ok_or(EngineError::Corrupt("indexed record past end of data file"))?;

        Ok((record.value, record.version as i64))
    }
}
