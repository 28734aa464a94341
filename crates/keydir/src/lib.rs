use record::{DelFlag, Record};
use std::collections::BTreeMap;

/// Bucket points a key at its most recent on-disk record. `del_flag`
/// distinguishes live entries from tombstones; tombstoned buckets stay in
/// the map so the delete survives replays of older records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Name of the data file holding the record.
    pub file: String,
    pub del_flag: DelFlag,
    pub key_size: u32,
    pub value_size: u32,
    /// Byte offset of the record's first header byte.
    pub data_pos: u64,
    pub time_sec: u32,
    pub time_nsec: u32,
    pub version: u64,
}

impl Bucket {
    /// Builds the bucket for a record appended to `file` at `data_pos`.
    pub fn from_record(file: &str, data_pos: u64, record: &Record) -> Bucket {
        Bucket {
            file: file.to_string(),
            del_flag: record.del_flag,
            key_size: record.key.len() as u32,
            value_size: record.value.len() as u32,
            data_pos,
            time_sec: record.time_sec,
            time_nsec: record.time_nsec,
            version: record.version,
        }
    }

    pub fn is_live(&self) -> bool {
        self.del_flag.is_live()
    }

    /// Write-order stamp; records compare by `(sec, nsec)`, newer wins.
    pub fn stamp(&self) -> (u32, u32) {
        (self.time_sec, self.time_nsec)
    }
}

/// The in-memory index: exactly one bucket per key, replaced wholesale on
/// every accepted write. Lookups never mutate.
#[derive(Debug, Default)]
pub struct KeyDir {
    map: BTreeMap<Vec<u8>, Bucket>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Bucket> {
        self.map.get(key)
    }

    /// Inserts or replaces the bucket for `key`, returning the old one.
    pub fn insert(&mut self, key: Vec<u8>, bucket: Bucket) -> Option<Bucket> {
        self.map.insert(key, bucket)
    }

    /// Total entries, live and tombstoned.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Ordered iterator over entries (key, Bucket).
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Bucket)> {
        self.map.iter()
    }
}
