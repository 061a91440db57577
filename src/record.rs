//! Per-file unit of work
//!
//! [`process_file`] is what a worker runs for each path. It never fails: an
//! unreadable file becomes a record with `failed` set.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::{self, TargetCounts, WordStats};
use crate::encoding::{self, ReadOptions};
use crate::error::ReadError;

/// Marker stored in the word fields of a failed record
pub const ERROR_MARKER: &str = "ERROR";

/// Statistics for one processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file_name: String,
    pub file_path: PathBuf,
    pub word_count: u64,
    pub target_counts: TargetCounts,
    pub longest_word: String,
    pub shortest_word: String,
    /// Size of the file content as read from disk
    pub bytes_read: u64,
    pub failed: bool,
}

impl FileRecord {
    #[cfg(test)]
    pub(crate) fn analyzed(path: &Path, stats: WordStats) -> Self {
        Self::analyzed_with_size(path, stats, 0)
    }

    /// Record for a successfully analyzed file
    pub fn analyzed_with_size(path: &Path, stats: WordStats, bytes_read: u64) -> Self {
        Self {
            file_name: file_name_of(path),
            file_path: path.to_path_buf(),
            word_count: stats.word_count,
            target_counts: stats.target_counts,
            longest_word: stats.longest_word,
            shortest_word: stats.shortest_word,
            bytes_read,
            failed: false,
        }
    }

    /// Record for a file that could not be processed
    pub fn failed(path: &Path, reason: &str) -> Self {
        Self {
            file_name: file_name_of(path),
            file_path: path.to_path_buf(),
            word_count: 0,
            target_counts: TargetCounts::default(),
            longest_word: format!("{}: {}", ERROR_MARKER, reason),
            shortest_word: ERROR_MARKER.to_string(),
            bytes_read: 0,
            failed: true,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Read and analyze a single file
pub fn process_file(path: &Path, options: ReadOptions) -> FileRecord {
    match read_file(path, options) {
        Ok((text, bytes_read)) => {
            let stats = analyzer::analyze(&text);
            log::debug!("Processed {:?}: {}", path, stats);
            FileRecord::analyzed_with_size(path, stats, bytes_read)
        }
        Err(e) => {
            log::warn!("Error processing file {:?}: {}", path, e);
            FileRecord::failed(path, &e.to_string())
        }
    }
}

fn read_file(path: &Path, options: ReadOptions) -> Result<(String, u64), ReadError> {
    let content = fs::read(path)?;
    let text = encoding::decode(&content, options)?;
    Ok((text, content.len() as u64))
}
