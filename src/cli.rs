//! Command-line interface definition for wordstats
//!
//! Provides argument parsing and validation for the directory word statistics tool.

use clap::Parser;
use std::path::PathBuf;

/// Concurrent word statistics for a directory of text files
///
/// Counts words, occurrences of "is", "are" and "you", and finds the longest
/// and shortest word of every file and of the whole directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wordstats",
    author = "m0h1nd4",
    version,
    about = "Concurrent word statistics for a directory of text files",
    long_about = r#"
Scans a directory for text files and processes them in parallel, reporting
per-file results as they complete and the directory totals at the end.

For every file: total words, counts of "is", "are" and "you" (case-insensitive),
longest and shortest word. Words are runs of ASCII letters; everything else
separates words.

EXAMPLES:
    # Top-level files only
    wordstats -i ./docs

    # Whole tree, 4 worker threads, per-file table
    wordstats -i ./docs --recursive -t 4 --files

    # Only markdown and plain text, transcode legacy encodings
    wordstats -i ./notes -r --extensions md,txt --detect-encoding
"#
)]
pub struct Args {
    /// Directory to scan
    #[arg(short, long, required = true, value_name = "DIR")]
    pub input: PathBuf,

    /// Include subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of worker threads (default: auto-detect)
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// File extensions treated as text
    #[arg(
        long,
        value_name = "EXT",
        default_value = "txt,text,md,java,c,cpp,h,py,js,html,css,xml,json,csv"
    )]
    pub extensions: String,

    /// Transcode files that are not valid UTF-8 instead of reporting them as failed
    #[arg(long, default_value_t = false)]
    pub detect_encoding: bool,

    /// Print a per-file table after processing
    #[arg(long, default_value_t = false)]
    pub files: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Parse file extensions to process
    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check arguments that clap cannot validate on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.input.is_dir() {
            anyhow::bail!("Input path is not a directory: {:?}", self.input);
        }

        if self.threads == Some(0) {
            anyhow::bail!("Thread count must be at least 1");
        }

        if self.get_extensions().is_empty() {
            anyhow::bail!("At least one file extension must be given");
        }

        Ok(())
    }
}
