//! Error types
//!
//! Per-file read failures never leave the worker that hit them: they become a
//! failed [`FileRecord`](crate::record::FileRecord). The errors here are the
//! ones a caller can actually observe.

use std::io;
use thiserror::Error;

/// Synchronous rejection of a session request
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a processing session is already running")]
    AlreadyRunning,

    #[error("failed to spawn session consumer thread")]
    Spawn(#[source] io::Error),
}

/// Worker pool construction failure
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// Failure to turn a file into text
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("content is not valid {encoding}")]
    Decode { encoding: &'static str },
}
