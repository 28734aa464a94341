//! Startup replay logic.
//!
//! This module handles the cold-start path: replaying every data file in
//! ascending suffix order (`data` lineage first, then the reserved
//! `merge_data` lineage) to rebuild the KeyDir from scratch. Replay relies
//! on record stamps being non-decreasing with file order: the newest
//! `(sec, nsec)` stamp per key wins, and ties keep the first-seen record.
//!
//! Replay is all-or-nothing: a torn tail record, a CRC mismatch, or any
//! decode failure aborts recovery with an error instead of loading a
//! partial index.

use crate::Result;
use datafile::{DataFile, FilePrefix, FileSet};
use keydir::{Bucket, KeyDir};

/// Replays every open data file, returning the rebuilt index and the
/// number of live keys.
pub(crate) fn rebuild_index(files: &FileSet) -> Result<(KeyDir, u64)> {
    let mut index = KeyDir::new();
    let mut used_cnt: u64 = 0;

    for prefix in FilePrefix::ALL {
        for file in files.files_for(prefix)? {
            let records = replay_file(file, &mut index, &mut used_cnt)?;
            tracing::debug!(file = file.name(), records, "replayed data file");
        }
    }

    Ok((index, used_cnt))
}

/// Reads `file` front to back, folding each record into the index.
/// Returns the number of records seen.
fn replay_file(file: &DataFile, index: &mut KeyDir, used_cnt: &mut u64) -> Result<u64> {
    let mut pos = 0u64;
    let mut records = 0u64;

    while let Some(record) = file.read_record_at(pos)? {
        let bucket = Bucket::from_record(file.name(), pos, &record);
        pos += record.encoded_len();
        records += 1;
        apply(index, used_cnt, record.key, bucket);
    }

    Ok(records)
}

/// Folds one replayed record into the index: insert if the key is new,
/// replace if the record is strictly newer, discard otherwise.
fn apply(index: &mut KeyDir, used_cnt: &mut u64, key: Vec<u8>, bucket: Bucket) {
    match index.get(&key) {
        None => {
            if bucket.is_live() {
                *used_cnt += 1;
            }
            index.insert(key, bucket);
        }
        Some(current) => {
            if bucket.stamp() > current.stamp() {
                match (current.is_live(), bucket.is_live()) {
                    (true, false) => *used_cnt -= 1,
                    (false, true) => *used_cnt += 1,
                    _ => {}
                }
                index.insert(key, bucket);
            }
        }
    }
}
