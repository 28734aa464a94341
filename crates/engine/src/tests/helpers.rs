use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the data file with the given suffix.
pub fn data_path(dir: &Path, suffix: u64) -> PathBuf {
    dir.join(format!("data.{:017}", suffix))
}

pub fn count_data_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| name.starts_with("data."))
                .unwrap_or(false)
        })
        .count()
}

/// Snapshot of every file in the directory with its size, for asserting
/// that a rejected operation touched nothing.
pub fn file_sizes(dir: &Path) -> BTreeMap<String, u64> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| {
            (
                e.file_name().to_string_lossy().into_owned(),
                e.metadata().unwrap().len(),
            )
        })
        .collect()
}
