//! Write path: `put()`, `del()`, and the shared `set_value()` core.
//!
//! All mutations flow through this module. Validation and the CAS version
//! check happen before any file mutation; the record is then stamped with
//! the wall clock, appended to the active data file (flush + fsync), and
//! only after the append succeeds is the KeyDir bucket replaced. An append
//! failure therefore leaves the index consistent with what the disk
//! durably holds.

use crate::{Engine, EngineError, Result, MAX_KEY_SIZE, MAX_RECORD_SIZE};
use datafile::FilePrefix;
use keydir::Bucket;
use record::{DelFlag, Record};
use std::time::{SystemTime, UNIX_EPOCH};

/// Version wildcard: accept the write regardless of the stored version.
pub const ANY_VERSION: i64 = -1;

impl Engine {
    /// Inserts or updates a key.
    ///
    /// `version` is the CAS expectation: [`ANY_VERSION`] writes
    /// unconditionally; `0` requires the key to be absent or tombstoned;
    /// any other value must equal the stored version of a live key. A
    /// fresh or resurrected key starts at version 1; every later accepted
    /// write increments it by one.
    ///
    /// # Errors
    ///
    /// [`EngineError::VersionConflict`] on a CAS mismatch (the stored
    /// version is included for the retry), plus the validation, clock, and
    /// I/O errors of the shared write path.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>, version: i64) -> Result<()> {
        self.set_value(key, value, DelFlag::Live, version)
    }

    /// Deletes a key by writing a tombstone record.
    ///
    /// The tombstone keeps the key's bucket in the index (marked deleted)
    /// so the delete survives recovery replays of older records. `version`
    /// follows the same CAS rules as [`put`](Engine::put).
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the key is absent or already
    /// tombstoned; a double delete mutates nothing.
    pub fn del(&mut self, key: Vec<u8>, version: i64) -> Result<()> {
        self.set_value(key, Vec::new(), DelFlag::Tombstone, version)
    }

    /// The shared write core.
    ///
    /// Ordering is load-bearing: every validation precedes the first file
    /// mutation, and the index update follows the fsynced append.
    fn set_value(
        &mut self,
        key: Vec<u8>,
        value: Vec<u8>,
        flag: DelFlag,
        requested: i64,
    ) -> Result<()> {
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty"));
        }
        if key.len() > MAX_KEY_SIZE {
            return Err(EngineError::KeyTooLarge {
                len: key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        if key.len() + value.len() > MAX_RECORD_SIZE {
            return Err(EngineError::RecordTooLarge {
                len: key.len() + value.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let prior = self.index.get(&key).cloned();

        // CAS: a tombstoned key counts as absent (stored version 0).
        let stored = match &prior {
            Some(bucket) if bucket.is_live() => bucket.version as i64,
            _ => 0,
        };
        if flag == DelFlag::Tombstone && stored == 0 {
            return Err(EngineError::NotFound);
        }
        if requested != ANY_VERSION && requested != stored {
            return Err(EngineError::VersionConflict { stored, requested });
        }
        let version = (stored as u64) + 1;

        // Replay order across restarts is decided by this stamp, so it
        // must move strictly forward past any prior bucket for the key.
        let (time_sec, time_nsec) = wall_clock()?;
        if let Some(bucket) = &prior {
            if (time_sec, time_nsec) <= bucket.stamp() {
                return Err(EngineError::ClockRegression);
            }
        }

        // Rotate first so the append lands in a file below the cap.
        if self.files.is_full(FilePrefix::Data)? {
            self.files.open_next(FilePrefix::Data)?;
            tracing::debug!(
                suffix = self.files.active_suffix(FilePrefix::Data),
                "rotated to new data file"
            );
        }

        let record = Record {
            del_flag: flag,
            time_sec,
            time_nsec,
            version,
            key,
            value,
        };

        let active = self.files.active_file(FilePrefix::Data)?;
        let data_pos = active.append_record(&record)?;
        let bucket = Bucket::from_record(active.name(), data_pos, &record);

        // The record is durable; now the index may acknowledge it.
        let was_live = prior.map(|b| b.is_live()).unwrap_or(false);
        match (was_live, flag.is_live()) {
            (false, true) => self.info.used_cnt += 1,
            (true, false) => self.info.used_cnt -= 1,
            _ => {}
        }
        self.index.insert(record.key, bucket);

        Ok(())
    }
}

/// Current wall-clock time as `(seconds, nanoseconds)` since the epoch.
fn wall_clock() -> Result<(u32, u32)> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| EngineError::ClockRegression)?;
    Ok((now.as_secs() as u32, now.subsec_nanos()))
}
