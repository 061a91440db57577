//! Work dispatch module
//!
//! A fixed-size worker pool runs one unit of work per path and hands each
//! finished [`FileRecord`] back over a completion channel. Records arrive in
//! completion order, never submission order.

use crossbeam_channel::{self as channel, Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::encoding::ReadOptions;
use crate::error::PoolError;
use crate::record::{process_file, FileRecord};

/// Cooperative cancellation shared by a session, its pool and its units.
///
/// Besides the flag, the token carries a channel that disconnects on cancel so
/// a thread blocked in `select!` wakes up.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = channel::bounded(0);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Dropping the only sender disconnects every clone of `signal`
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once cancelled
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool with `size` workers; `0` means one per available CPU
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let size = if size == 0 { num_cpus::get() } else { size };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("wordstats-worker-{}", i))
            .build()?;

        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Submit every path for reading and analysis
    pub fn run(self, paths: Vec<PathBuf>, options: ReadOptions, cancel: CancelToken) -> Completions {
        self.run_with(paths, cancel, move |path| process_file(path, options))
    }

    /// Submit every path to an arbitrary unit of work.
    ///
    /// A unit that panics is reported as a failed record, so the stream still
    /// yields exactly one record per path.
    pub fn run_with<F>(self, paths: Vec<PathBuf>, cancel: CancelToken, unit: F) -> Completions
    where
        F: Fn(&Path) -> FileRecord + Send + Sync + 'static,
    {
        let total = paths.len();
        let unit = Arc::new(unit);
        let (tx, rx) = channel::unbounded();

        log::debug!("Submitting {} units to {} workers", total, self.size);

        for path in paths {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let unit = Arc::clone(&unit);

            self.pool.spawn(move || {
                // Queued units skip their work once cancelled
                if cancel.is_cancelled() {
                    return;
                }

                let record = panic::catch_unwind(AssertUnwindSafe(|| (*unit)(&path)))
                    .unwrap_or_else(|_| {
                        log::error!("Worker panicked while processing {:?}", path);
                        FileRecord::failed(&path, "worker panicked")
                    });

                // Receiver gone means the consumer abandoned the batch
                let _ = tx.send(record);
            });
        }

        Completions {
            results: rx,
            cancel,
            total,
            received: 0,
            _pool: self,
        }
    }
}

/// Completion stream of one submitted batch.
///
/// Owns the pool; dropping it lets the workers wind down once their current
/// unit returns.
pub struct Completions {
    results: Receiver<FileRecord>,
    cancel: CancelToken,
    total: usize,
    received: usize,
    _pool: WorkerPool,
}

impl Completions {
    /// Number of submitted units
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of records handed out so far
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_exhausted(&self) -> bool {
        self.received >= self.total
    }

    /// Stop the batch: queued units are skipped, in-flight units get up to
    /// `grace` to finish before they are left to run detached.
    ///
    /// Returns how many late records were discarded.
    pub fn abandon(self, grace: Duration) -> usize {
        self.cancel.cancel();

        let deadline = Instant::now() + grace;
        let mut discarded = 0;

        loop {
            match self.results.recv_deadline(deadline) {
                Ok(_) => discarded += 1,
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("All workers drained, {} late results discarded", discarded);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Abandoning in-flight units after {:?} grace period",
                        grace
                    );
                    break;
                }
            }
        }

        discarded
    }
}

impl Iterator for Completions {
    type Item = FileRecord;

    /// Block until the next unit completes.
    ///
    /// Returns `None` once every unit is accounted for or the batch is
    /// cancelled.
    fn next(&mut self) -> Option<FileRecord> {
        if self.is_exhausted() || self.cancel.is_cancelled() {
            return None;
        }

        crossbeam_channel::select! {
            recv(self.results) -> msg => match msg {
                Ok(record) if !self.cancel.is_cancelled() => {
                    self.received += 1;
                    Some(record)
                }
                _ => None,
            },
            recv(self.cancel.signal()) -> _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.total - self.received))
    }
}
