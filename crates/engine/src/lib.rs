//! # Engine - BitcaskDB storage engine
//!
//! The central orchestrator that ties together the [`record`], [`datafile`],
//! and [`keydir`] crates into a complete log-structured key-value store with
//! optimistic-concurrency (CAS) writes.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → validate → CAS check → clock stamp │
//! │              |                                │
//! │              |  (active file at 10 MiB cap?)  │
//! │              |            yes                 │
//! │              v                                │
//! │         rotate → data.{suffix+1}              │
//! │              |                                │
//! │              v                                │
//! │     append record (flush + fsync)             │
//! │              |                                │
//! │              v                                │
//! │     replace KeyDir bucket, adjust counters    │
//! │                                               │
//! │ read.rs → KeyDir lookup → seek + read record  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `lib.rs`     | `Engine` struct, constructor, accessors, `Debug` |
//! | [`recovery`] | Startup replay of every data file into the KeyDir|
//! | [`write`]    | `put()`, `del()`, the shared `set_value()` core  |
//! | [`read`]     | `get()`                                          |
//! | [`status`]   | Aggregate counters                               |
//! | [`error`]    | Public error taxonomy                            |
//!
//! ## Durability & Crash Safety
//!
//! Every accepted write is appended, flushed, and fsynced **before** the
//! in-memory index is touched, so the index never acknowledges a record the
//! disk does not hold. The store is append-only: deletes write tombstones
//! and old records are never rewritten. On startup the whole index is
//! rebuilt by replaying every data file in suffix order; a corrupt or torn
//! record anywhere fails the replay, so a damaged directory refuses to
//! load rather than loading partially.
//!
//! ## Concurrency Model
//!
//! The engine is logically single-threaded: mutations take `&mut self`,
//! `get`/`status` take `&self`, and the borrow checker enforces one
//! critical section per instance. A multithreaded host wraps an instance in
//! a `Mutex` (or `RwLock`: the `&self` read path is safe to share because
//! each data file guards its cursor with an interior lock).

mod error;
mod read;
mod recovery;
mod status;
mod write;

pub use error::{EngineError, Result};
pub use status::Status;
pub use write::ANY_VERSION;

use datafile::{FilePrefix, FileSet};
use keydir::KeyDir;
use std::path::{Path, PathBuf};

/// Maximum allowed key size in bytes (1 KiB).
pub const MAX_KEY_SIZE: usize = record::MAX_KEY_SIZE;

/// Maximum combined key + value payload per record (10 MiB).
pub const MAX_RECORD_SIZE: usize = record::MAX_RECORD_SIZE;

/// Aggregate counters carried per engine instance.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Info {
    /// Number of live (non-tombstoned) keys.
    pub(crate) used_cnt: u64,
    /// Reserved transaction counter: reported by `status()`, never
    /// incremented by the engine.
    pub(crate) trx_id: u64,
}

/// The storage engine: one instance per database directory.
///
/// # Write Path
///
/// 1. Validate the key and payload sizes (no I/O yet).
/// 2. Check the requested version against the stored one (CAS).
/// 3. Stamp the record with the wall clock; reject clock regressions.
/// 4. Rotate to a fresh data file if the active one is at the cap.
/// 5. Append the record with flush + fsync.
/// 6. Only then replace the key's bucket and adjust the live count.
///
/// # Read Path
///
/// KeyDir lookup, then a single seek + read in the owning data file. Reads
/// never mutate the index.
///
/// # Recovery
///
/// On construction ([`Engine::new`]), every data file is replayed in
/// ascending suffix order (`data` lineage first, then the reserved
/// `merge_data` lineage) to rebuild the KeyDir; newer `(sec, nsec)` stamps
/// win, ties keep the first-seen record.
pub struct Engine {
    pub(crate) dir: PathBuf,
    pub(crate) files: FileSet,
    pub(crate) index: KeyDir,
    pub(crate) info: Info,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("keys", &self.index.len())
            .field("live_keys", &self.info.used_cnt)
            .field("active_suffix", &self.files.active_suffix(FilePrefix::Data))
            .field("data_files", &self.files.file_count(FilePrefix::Data))
            .field("max_file_size", &self.files.max_file_size())
            .finish()
    }
}

impl Engine {
    /// Opens (or creates) the database at `dir`, performing full recovery.
    ///
    /// # Recovery Steps
    ///
    /// 1. Create the directory if it does not exist.
    /// 2. Discover and open every data file (fatal on malformed or
    ///    out-of-order filenames), creating the initial suffix-1 files for
    ///    a fresh directory.
    /// 3. Replay every file in ascending suffix order, rebuilding the
    ///    KeyDir and the live-key count.
    ///
    /// # Errors
    ///
    /// Any invalid-layout, decode, CRC, or I/O failure aborts construction;
    /// nothing is partially loaded.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let files = FileSet::open(&dir)?;
        let (index, used_cnt) = recovery::rebuild_index(&files)?;

        tracing::info!(
            dir = %dir.display(),
            data_files = files.file_count(FilePrefix::Data),
            keys = index.len(),
            live_keys = used_cnt,
            "bitcask engine opened"
        );

        Ok(Self {
            dir,
            files,
            index,
            info: Info { used_cnt, trx_id: 0 },
        })
    }

    /// The database directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Total keys tracked in the index, live and tombstoned.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Live (non-tombstoned) keys.
    #[must_use]
    pub fn live_key_count(&self) -> u64 {
        self.info.used_cnt
    }

    /// Suffix of the active `data` file.
    #[must_use]
    pub fn active_suffix(&self) -> u64 {
        self.files.active_suffix(FilePrefix::Data)
    }

    /// Number of open `data` files.
    #[must_use]
    pub fn data_file_count(&self) -> usize {
        self.files.file_count(FilePrefix::Data)
    }

    /// Current rotation cap in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.files.max_file_size()
    }

    /// Updates the rotation cap. Useful for testing or runtime tuning.
    pub fn set_max_file_size(&mut self, bytes: u64) {
        self.files.set_max_file_size(bytes);
    }
}

#[cfg(test)]
mod tests;
