//! # Datafile - BitcaskDB data file management
//!
//! Owns the set of append-only files in one database directory: naming,
//! discovery, rotation by size, and the open-handle table shared by the
//! write and read paths.
//!
//! ## File naming
//!
//! ```text
//! <dir>/data.00000000000000001        active / sealed write lineage
//! <dir>/merge_data.00000000000000001  merge lineage (reserved, never written)
//! ```
//!
//! Suffixes are 17-digit zero-padded decimals in `[1, 10^17 - 1]`, strictly
//! increasing per prefix. Zero padding makes lexicographic filename order
//! equal numeric suffix order. A directory containing a file that does not
//! parse as `{prefix}.{17 digits}`, or whose suffixes are not strictly
//! increasing once sorted, fails to open with an invalid-layout error: a
//! corrupted directory must not partially load.
//!
//! ## Handles
//!
//! Every discovered file is opened once and kept in the open table for the
//! lifetime of the [`FileSet`]: the highest suffix per prefix in append
//! mode, all lower suffixes read-only. [`DataFile`] wraps its handle in a
//! `Mutex` so shared references can seek-then-read without racing each
//! other on the file cursor.

use record::{read_record, write_record, Record, RecordError};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Number of decimal digits in a file suffix.
pub const SUFFIX_DIGITS: usize = 17;

/// Highest representable suffix (`10^17 - 1`).
pub const MAX_SUFFIX: u64 = 99_999_999_999_999_999;

/// Size cap per data file before rotation (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors raised by file discovery, rotation, and record transfer.
#[derive(Debug, Error)]
pub enum DataFileError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record-level encode/decode/integrity failure.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The directory contains a file that is not a well-formed data file,
    /// or the suffix sequence is not strictly increasing.
    #[error("invalid file layout: {0}")]
    InvalidLayout(String),

    /// No suffix is left after `10^17 - 1`.
    #[error("suffix space exhausted for prefix {prefix}")]
    SuffixExhausted { prefix: &'static str },

    /// A file handle's lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// The two file lineages sharing a database directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilePrefix {
    /// Live write lineage: the engine appends here.
    Data,
    /// Merge lineage: discovered and replayed, never written.
    MergeData,
}

impl FilePrefix {
    /// Both prefixes, in recovery replay order.
    pub const ALL: [FilePrefix; 2] = [FilePrefix::Data, FilePrefix::MergeData];

    /// The filename stem for this prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilePrefix::Data => "data",
            FilePrefix::MergeData => "merge_data",
        }
    }
}

/// Formats the canonical filename for a prefix and suffix.
#[must_use]
pub fn file_name(prefix: FilePrefix, suffix: u64) -> String {
    format!("{}.{:017}", prefix.as_str(), suffix)
}

/// Parses a filename back into its prefix and suffix.
///
/// # Errors
///
/// [`DataFileError::InvalidLayout`] unless the name is exactly
/// `{data|merge_data}.{17 digits}` with a nonzero suffix.
pub fn parse_file_name(name: &str) -> Result<(FilePrefix, u64), DataFileError> {
    let invalid = || DataFileError::InvalidLayout(format!("unexpected file name: {name}"));

    let (stem, digits) = name.split_once('.').ok_or_else(invalid)?;
    let prefix = match stem {
        "data" => FilePrefix::Data,
        "merge_data" => FilePrefix::MergeData,
        _ => return Err(invalid()),
    };

    if digits.len() != SUFFIX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let suffix: u64 = digits.parse().map_err(|_| invalid())?;
    if suffix == 0 {
        return Err(invalid());
    }

    Ok((prefix, suffix))
}

/// One open data file: its name and a cursor-guarded handle.
#[derive(Debug)]
pub struct DataFile {
    name: String,
    /// The handle is shared between appends and positioned reads; the Mutex
    /// keeps seek-then-read sequences atomic under `&self`.
    file: Mutex<File>,
}

impl DataFile {
    fn open(path: &Path, name: String, append: bool) -> Result<DataFile, DataFileError> {
        let file = if append {
            OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?
        } else {
            OpenOptions::new().read(true).open(path)?
        };
        Ok(DataFile {
            name,
            file: Mutex::new(file),
        })
    }

    fn create(path: &Path, name: String) -> Result<DataFile, DataFileError> {
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .append(true)
            .open(path)?;
        Ok(DataFile {
            name,
            file: Mutex::new(file),
        })
    }

    /// The filename this handle was opened under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current on-disk size in bytes.
    pub fn size(&self) -> Result<u64, DataFileError> {
        let file = self.lock()?;
        Ok(file.metadata()?.len())
    }

    /// Appends `record`, returning the offset it landed at.
    ///
    /// The offset equals the file size before the append; the record is
    /// flushed and fsynced before this returns.
    pub fn append_record(&self, record: &Record) -> Result<u64, DataFileError> {
        let mut file = self.lock()?;
        Ok(write_record(&mut *file, record)?)
    }

    /// Reads the record starting at `pos`, or `Ok(None)` if `pos` is the
    /// clean end of the file.
    pub fn read_record_at(&self, pos: u64) -> Result<Option<Record>, DataFileError> {
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(pos))?;
        Ok(read_record(&mut *file)?)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>, DataFileError> {
        self.file
            .lock()
            .map_err(|e| DataFileError::LockPoisoned(e.to_string()))
    }
}

/// The open-handle table for one database directory.
///
/// Holds every data file handle for the engine's lifetime; all handles
/// close together when the set is dropped.
#[derive(Debug)]
pub struct FileSet {
    dir: PathBuf,
    /// Open table: filename -> handle.
    files: HashMap<String, DataFile>,
    /// Discovered suffixes per prefix, ascending. The last entry is the
    /// active (append-mode) file for that prefix.
    data_suffixes: Vec<u64>,
    merge_suffixes: Vec<u64>,
    max_file_size: u64,
}

impl FileSet {
    /// Discovers and opens every data file under `dir`, creating the
    /// directory and initial suffix-1 files as needed.
    ///
    /// # Errors
    ///
    /// [`DataFileError::InvalidLayout`] if any regular file in the
    /// directory fails to parse or the suffix order is violated; I/O errors
    /// otherwise. Discovery is all-or-nothing.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<FileSet, DataFileError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut data_suffixes = Vec::new();
        let mut merge_suffixes = Vec::new();

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().into_string().map_err(|n| {
                DataFileError::InvalidLayout(format!("non-utf8 file name: {n:?}"))
            })?;
            match parse_file_name(&name)? {
                (FilePrefix::Data, suffix) => data_suffixes.push(suffix),
                (FilePrefix::MergeData, suffix) => merge_suffixes.push(suffix),
            }
        }

        data_suffixes.sort_unstable();
        merge_suffixes.sort_unstable();
        check_strictly_increasing(FilePrefix::Data, &data_suffixes)?;
        check_strictly_increasing(FilePrefix::MergeData, &merge_suffixes)?;

        let mut set = FileSet {
            dir,
            files: HashMap::new(),
            data_suffixes,
            merge_suffixes,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        };
        set.open_prefix(FilePrefix::Data)?;
        set.open_prefix(FilePrefix::MergeData)?;
        Ok(set)
    }

    /// Opens every discovered file for `prefix` (highest suffix in append
    /// mode, the rest read-only), creating suffix 1 if none exist.
    fn open_prefix(&mut self, prefix: FilePrefix) -> Result<(), DataFileError> {
        if self.suffixes(prefix).is_empty() {
            let name = file_name(prefix, 1);
            let handle = DataFile::create(&self.dir.join(&name), name.clone())?;
            self.files.insert(name, handle);
            self.suffixes_mut(prefix).push(1);
            return Ok(());
        }

        let suffixes = self.suffixes(prefix).to_vec();
        let last = suffixes.len() - 1;
        for (i, &suffix) in suffixes.iter().enumerate() {
            let name = file_name(prefix, suffix);
            let handle = DataFile::open(&self.dir.join(&name), name.clone(), i == last)?;
            self.files.insert(name, handle);
        }
        Ok(())
    }

    /// The directory this set was opened on.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The active (append-mode) suffix for `prefix`.
    #[must_use]
    pub fn active_suffix(&self, prefix: FilePrefix) -> u64 {
        self.suffixes(prefix).last().copied().unwrap_or(0)
    }

    /// Number of open files for `prefix`.
    #[must_use]
    pub fn file_count(&self, prefix: FilePrefix) -> usize {
        self.suffixes(prefix).len()
    }

    /// Looks up an open handle by filename.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&DataFile> {
        self.files.get(name)
    }

    /// The active (append-mode) file for `prefix`.
    pub fn active_file(&self, prefix: FilePrefix) -> Result<&DataFile, DataFileError> {
        let name = file_name(prefix, self.active_suffix(prefix));
        self.files.get(&name).ok_or_else(|| {
            DataFileError::InvalidLayout(format!("active file {name} missing from open table"))
        })
    }

    /// All open files for `prefix` in ascending suffix order, the order
    /// recovery replays them in.
    pub fn files_for(&self, prefix: FilePrefix) -> Result<Vec<&DataFile>, DataFileError> {
        self.suffixes(prefix)
            .iter()
            .map(|&suffix| {
                let name = file_name(prefix, suffix);
                self.files.get(&name).ok_or_else(|| {
                    DataFileError::InvalidLayout(format!("file {name} missing from open table"))
                })
            })
            .collect()
    }

    /// Whether the active file for `prefix` has reached the size cap.
    pub fn is_full(&self, prefix: FilePrefix) -> Result<bool, DataFileError> {
        Ok(self.active_file(prefix)?.size()? >= self.max_file_size)
    }

    /// Creates the next-suffix file for `prefix` and makes it active.
    ///
    /// # Errors
    ///
    /// [`DataFileError::SuffixExhausted`] past `10^17 - 1`.
    pub fn open_next(&mut self, prefix: FilePrefix) -> Result<(), DataFileError> {
        let next = self.active_suffix(prefix) + 1;
        if next > MAX_SUFFIX {
            return Err(DataFileError::SuffixExhausted {
                prefix: prefix.as_str(),
            });
        }
        let name = file_name(prefix, next);
        let handle = DataFile::create(&self.dir.join(&name), name.clone())?;
        self.files.insert(name, handle);
        self.suffixes_mut(prefix).push(next);
        Ok(())
    }

    /// Current rotation cap in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Updates the rotation cap. Useful for testing or runtime tuning.
    pub fn set_max_file_size(&mut self, bytes: u64) {
        self.max_file_size = bytes;
    }

    fn suffixes(&self, prefix: FilePrefix) -> &[u64] {
        match prefix {
            FilePrefix::Data => &self.data_suffixes,
            FilePrefix::MergeData => &self.merge_suffixes,
        }
    }

    fn suffixes_mut(&mut self, prefix: FilePrefix) -> &mut Vec<u64> {
        match prefix {
            FilePrefix::Data => &mut self.data_suffixes,
            FilePrefix::MergeData => &mut self.merge_suffixes,
        }
    }
}

fn check_strictly_increasing(
    prefix: FilePrefix,
    suffixes: &[u64],
) -> Result<(), DataFileError> {
    for pair in suffixes.windows(2) {
        if pair[1] <= pair[0] {
            return Err(DataFileError::InvalidLayout(format!(
                "suffixes for prefix {} are not strictly increasing ({} then {})",
                prefix.as_str(),
                pair[0],
                pair[1]
            )));
        }
    }
    Ok(())
}
