//! File discovery module
//!
//! Finds the text files a session will process. Discovery never fails: a
//! missing or unreadable directory simply yields no files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as text when no allow-list is given
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "java", "c", "cpp", "h", "py", "js", "html", "css", "xml", "json", "csv",
];

/// Source of the paths a session processes
pub trait FileLister: Send + Sync {
    /// List regular text files under `dir`, descending into subdirectories
    /// when `recursive` is set
    fn list_text_files(&self, dir: &Path, recursive: bool) -> Vec<PathBuf>;
}

impl<F> FileLister for F
where
    F: Fn(&Path, bool) -> Vec<PathBuf> + Send + Sync,
{
    fn list_text_files(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        self(dir, recursive)
    }
}

/// Walks a directory and keeps files whose extension is on an allow-list
#[derive(Debug, Clone)]
pub struct ExtensionLister {
    extensions: Vec<String>,
}

impl ExtensionLister {
    /// Extensions are matched case-insensitively, without the leading dot
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn is_text_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ExtensionLister {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl FileLister for ExtensionLister {
    fn list_text_files(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        if !dir.is_dir() {
            log::warn!("Directory does not exist or is not a directory: {:?}", dir);
            return Vec::new();
        }

        let walker = if recursive {
            WalkDir::new(dir)
        } else {
            WalkDir::new(dir).max_depth(1)
        };

        walker
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Error scanning directory: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_text_file(path))
            .collect()
    }
}
