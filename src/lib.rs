//! # Word Stats
//!
//! Concurrent word statistics for a directory of text files.
//!
//! ## Features
//!
//! - **Per-file statistics**: word count, counts of "is", "are" and "you",
//!   longest and shortest word
//! - **Directory totals**: aggregated across every file as results arrive
//! - **Parallel processing**: bounded worker pool, results streamed back in
//!   completion order to a single aggregating consumer
//! - **Live progress**: ordered event stream for any presentation layer
//! - **Cancellation**: cooperative, bounded in time, keeps partial results
//!
//! ## Usage
//!
//! ```bash
//! # Top-level files of a directory
//! wordstats -i ./docs
//!
//! # Whole tree with a per-file table
//! wordstats -i ./docs --recursive --files
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use word_stats::discovery::ExtensionLister;
//! use word_stats::session::{ProcessingSession, SessionConfig, SessionEvent};
//!
//! let session = ProcessingSession::new(ExtensionLister::default(), SessionConfig::default());
//! let events = session.start("./docs", true).unwrap();
//!
//! for event in events {
//!     if let SessionEvent::Complete(stats) = event {
//!         println!("{}", stats);
//!     }
//! }
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod cli;
pub mod discovery;
pub mod encoding;
pub mod error;
pub mod pool;
pub mod progress;
pub mod record;
pub mod session;

pub use aggregate::{AggregateStats, ResultAggregator};
pub use analyzer::{analyze, TargetCounts, TargetWord, WordStats};
pub use cli::Args;
pub use record::{process_file, FileRecord};
pub use session::{ProcessingSession, SessionConfig, SessionEvent, SessionState};
