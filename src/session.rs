//! Processing session
//!
//! Orchestrates one run: discovery, dispatch to the worker pool, aggregation
//! and event delivery. A single consumer thread per run performs every
//! `absorb` and emits every event; workers only send records back.

use crossbeam_channel::{self as channel, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::aggregate::{AggregateStats, ResultAggregator};
use crate::cli::Args;
use crate::discovery::{ExtensionLister, FileLister};
use crate::encoding::ReadOptions;
use crate::error::SessionError;
use crate::pool::{CancelToken, WorkerPool};
use crate::record::FileRecord;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default time in-flight units get to finish after a cancel
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Worker count; `0` means one per available CPU
    pub pool_size: usize,
    /// Events buffered before the consumer waits for the presentation layer
    pub event_capacity: usize,
    pub cancel_grace: Duration,
    pub read: ReadOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pool_size: 0,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            read: ReadOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            pool_size: args.threads.unwrap_or(0),
            read: ReadOptions {
                detect_encoding: args.detect_encoding,
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Cancelling,
}

/// Notification from a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { total: usize },
    FileProcessed { record: FileRecord, done: usize, total: usize },
    Progress { percent: u8 },
    Complete(AggregateStats),
    Error { context: String, message: String },
}

impl SessionEvent {
    /// Outcome this event ends the session with, if it is terminal
    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            SessionEvent::Complete(_) => Some(SessionOutcome::Completed),
            SessionEvent::Error { .. } => Some(SessionOutcome::Failed),
            _ => None,
        }
    }

    pub fn dispatch<S: ProgressSink + ?Sized>(self, sink: &mut S) {
        match self {
            SessionEvent::Started { total } => sink.on_started(total),
            SessionEvent::FileProcessed { record, done, total } => {
                sink.on_file_processed(&record, done, total)
            }
            SessionEvent::Progress { percent } => sink.on_progress(percent),
            SessionEvent::Complete(stats) => sink.on_complete(&stats),
            SessionEvent::Error { context, message } => sink.on_error(&context, &message),
        }
    }
}

/// How a session's event stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Receiver of session progress
///
/// Calls arrive in order: one `on_started`, then an `on_file_processed` /
/// `on_progress` pair per file, then `on_complete`. A session that finds no
/// files sends only `on_error`; a cancelled session just stops.
pub trait ProgressSink {
    fn on_started(&mut self, total: usize);
    fn on_file_processed(&mut self, record: &FileRecord, done: usize, total: usize);
    fn on_progress(&mut self, percent: u8);
    fn on_complete(&mut self, stats: &AggregateStats);
    fn on_error(&mut self, context: &str, message: &str);
}

/// Events of one session, consumed on whichever thread the caller chooses
pub struct EventStream {
    events: Receiver<SessionEvent>,
}

impl EventStream {
    /// Deliver every event to `sink` on the calling thread until the session
    /// ends
    pub fn drain_into<S: ProgressSink + ?Sized>(self, sink: &mut S) -> SessionOutcome {
        for event in self.events.iter() {
            let outcome = event.outcome();
            event.dispatch(sink);
            if let Some(outcome) = outcome {
                return outcome;
            }
        }

        SessionOutcome::Cancelled
    }
}

impl Iterator for EventStream {
    type Item = SessionEvent;

    fn next(&mut self) -> Option<SessionEvent> {
        self.events.recv().ok()
    }
}

/// State shared between the session handle and its consumer thread
struct Shared {
    state: Mutex<SessionState>,
    /// Write-locked only by the consumer thread
    aggregator: RwLock<ResultAggregator>,
    cancel: Mutex<CancelToken>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state() = state;
    }

    fn absorb(&self, record: FileRecord) {
        self.aggregator
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .absorb(record);
    }

    fn reset(&self) {
        self.aggregator
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    fn snapshot(&self) -> AggregateStats {
        self.aggregator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_cancel_token(&self, token: CancelToken) {
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Runs directory scans, one at a time
pub struct ProcessingSession {
    lister: Arc<dyn FileLister>,
    config: SessionConfig,
    shared: Arc<Shared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessingSession {
    pub fn new<L: FileLister + 'static>(lister: L, config: SessionConfig) -> Self {
        Self {
            lister: Arc::new(lister),
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                aggregator: RwLock::new(ResultAggregator::new()),
                cancel: Mutex::new(CancelToken::new()),
            }),
            consumer: Mutex::new(None),
        }
    }

    /// Session over [`ExtensionLister::default`] with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ExtensionLister::default(), SessionConfig::default())
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() != SessionState::Idle
    }

    /// Copy of the aggregate as of the last absorbed record
    pub fn snapshot(&self) -> AggregateStats {
        self.shared.snapshot()
    }

    /// Start scanning `directory` on a background consumer thread.
    ///
    /// Rejected with [`SessionError::AlreadyRunning`] unless idle.
    pub fn start<P: AsRef<Path>>(
        &self,
        directory: P,
        recursive: bool,
    ) -> Result<EventStream, SessionError> {
        let cancel = CancelToken::new();
        {
            let mut state = self.shared.state();
            if *state != SessionState::Idle {
                return Err(SessionError::AlreadyRunning);
            }
            // A cancel that sees Running must reach this run's token
            self.shared.replace_cancel_token(cancel.clone());
            *state = SessionState::Running;
        }

        self.shared.reset();

        let (tx, rx) = channel::bounded(self.config.event_capacity.max(1));
        let run = Run {
            shared: Arc::clone(&self.shared),
            lister: Arc::clone(&self.lister),
            config: self.config.clone(),
            directory: directory.as_ref().to_path_buf(),
            recursive,
            cancel,
            events: tx,
        };

        let handle = thread::Builder::new()
            .name("wordstats-session".to_string())
            .spawn(move || run.execute())
            .map_err(|e| {
                self.shared.set_state(SessionState::Idle);
                SessionError::Spawn(e)
            })?;

        *self.consumer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(EventStream { events: rx })
    }

    /// Stop the running session without a completion event.
    ///
    /// Results absorbed so far stay available through [`snapshot`](Self::snapshot).
    pub fn cancel(&self) {
        let mut state = self.shared.state();
        if *state == SessionState::Running {
            *state = SessionState::Cancelling;
            self.shared.cancel_token().cancel();
            log::info!("Cancellation requested");
        }
    }

    /// Wait for the current consumer thread to exit
    pub fn join(&self) {
        let handle = self
            .consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Session consumer thread panicked");
                self.shared.set_state(SessionState::Idle);
            }
        }
    }
}

impl Drop for ProcessingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Everything the consumer thread of one run owns
struct Run {
    shared: Arc<Shared>,
    lister: Arc<dyn FileLister>,
    config: SessionConfig,
    directory: PathBuf,
    recursive: bool,
    cancel: CancelToken,
    events: Sender<SessionEvent>,
}

impl Run {
    fn execute(self) {
        log::info!(
            "Scanning {:?} ({})",
            self.directory,
            if self.recursive { "recursive" } else { "top level only" }
        );

        let listed = panic::catch_unwind(AssertUnwindSafe(|| {
            self.lister.list_text_files(&self.directory, self.recursive)
        }));
        let paths = match listed {
            Ok(paths) => paths,
            Err(_) => {
                log::error!("File lister panicked while scanning {:?}", self.directory);
                self.fail("File discovery", "Listing the selected directory failed");
                return;
            }
        };

        if self.cancel.is_cancelled() {
            self.shared.set_state(SessionState::Idle);
            return;
        }

        if paths.is_empty() {
            self.fail("No files", "No text files found in the selected directory");
            return;
        }

        let pool = match WorkerPool::new(self.config.pool_size) {
            Ok(pool) => pool,
            Err(e) => {
                self.fail("Worker pool", &e.to_string());
                return;
            }
        };

        let total = paths.len();
        log::info!("Found {} files. Using {} threads.", total, pool.size());

        if !self.emit(SessionEvent::Started { total }) {
            self.shared.set_state(SessionState::Idle);
            return;
        }

        let mut completions = pool.run(paths, self.config.read, self.cancel.clone());

        while let Some(record) = completions.next() {
            let done = completions.received();
            self.shared.absorb(record.clone());

            let percent = (done * 100 / total) as u8;
            if !self.emit(SessionEvent::FileProcessed { record, done, total })
                || !self.emit(SessionEvent::Progress { percent })
            {
                break;
            }
        }

        // Snapshot before going Idle, a restart resets the aggregate
        let completed = {
            let mut state = self.shared.state();
            if *state == SessionState::Running && completions.is_exhausted() {
                let stats = self.shared.snapshot();
                *state = SessionState::Idle;
                Some(stats)
            } else {
                None
            }
        };

        if let Some(stats) = completed {
            log::info!("Processing complete: {}", stats);
            // Idle already, so nothing can cancel this send
            let _ = self.events.send(SessionEvent::Complete(stats));
        } else {
            let (done, total) = (completions.received(), completions.total());
            let discarded = completions.abandon(self.config.cancel_grace);
            log::info!(
                "Session cancelled after {} of {} files ({} late results discarded)",
                done,
                total,
                discarded
            );
            self.shared.set_state(SessionState::Idle);
        }
    }

    /// Report a session-level error and return to idle
    fn fail(&self, context: &str, message: &str) {
        log::warn!("{}: {}", context, message);
        self.shared.set_state(SessionState::Idle);
        let _ = self.events.send(SessionEvent::Error {
            context: context.to_string(),
            message: message.to_string(),
        });
    }

    /// Send an event, giving up if the session is cancelled while waiting.
    ///
    /// Returns false once cancelled. A dropped receiver is not an error: the
    /// run carries on and its results stay available through the snapshot.
    fn emit(&self, event: SessionEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        crossbeam_channel::select! {
            send(self.events, event) -> res => {
                if res.is_err() {
                    log::debug!("Event receiver dropped");
                }
                true
            },
            recv(self.cancel.signal()) -> _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::TargetWord;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Started(usize),
        File(String, usize, usize),
        Progress(u8),
        Complete(u64),
        Error(String, String),
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: Vec<Seen>,
    }

    impl ProgressSink for RecordingSink {
        fn on_started(&mut self, total: usize) {
            self.seen.push(Seen::Started(total));
        }

        fn on_file_processed(&mut self, record: &FileRecord, done: usize, total: usize) {
            self.seen.push(Seen::File(record.file_name.clone(), done, total));
        }

        fn on_progress(&mut self, percent: u8) {
            self.seen.push(Seen::Progress(percent));
        }

        fn on_complete(&mut self, stats: &AggregateStats) {
            self.seen.push(Seen::Complete(stats.files_processed));
        }

        fn on_error(&mut self, context: &str, message: &str) {
            self.seen.push(Seen::Error(context.to_string(), message.to_string()));
        }
    }

    fn fixture(count: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        for i in 0..count {
            fs::write(
                dir.path().join(format!("doc{:03}.txt", i)),
                "Is this what you are looking for",
            )
            .unwrap();
        }
        dir
    }

    fn config(pool_size: usize) -> SessionConfig {
        SessionConfig {
            pool_size,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_full_run_event_order() {
        let dir = fixture(5);
        let session = ProcessingSession::new(ExtensionLister::default(), config(2));

        let mut sink = RecordingSink::default();
        let outcome = session.start(dir.path(), false).unwrap().drain_into(&mut sink);
        session.join();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(session.state(), SessionState::Idle);

        assert_eq!(sink.seen.len(), 1 + 5 * 2 + 1);
        assert_eq!(sink.seen[0], Seen::Started(5));
        for (i, pair) in sink.seen[1..11].chunks(2).enumerate() {
            match &pair[0] {
                Seen::File(_, done, total) => {
                    assert_eq!(*done, i + 1);
                    assert_eq!(*total, 5);
                }
                other => panic!("expected file event, got {:?}", other),
            }
            assert_eq!(pair[1], Seen::Progress(((i + 1) * 100 / 5) as u8));
        }
        assert_eq!(sink.seen[11], Seen::Complete(5));

        let stats = session.snapshot();
        assert_eq!(stats.files_processed, 5);
        assert_eq!(stats.total_word_count, 35);
        assert_eq!(stats.total_target_counts[TargetWord::Is], 5);
        assert_eq!(stats.longest_word_seen, "looking");
        assert_eq!(stats.shortest_word_seen, "Is");
    }

    #[test]
    fn test_each_file_reported_once() {
        let dir = fixture(40);
        for pool_size in [1, 40, 64] {
            let session = ProcessingSession::new(ExtensionLister::default(), config(pool_size));
            let events: Vec<_> = session.start(dir.path(), true).unwrap().collect();
            session.join();

            let mut names: Vec<_> = events
                .iter()
                .filter_map(|e| match e {
                    SessionEvent::FileProcessed { record, .. } => Some(record.file_name.clone()),
                    _ => None,
                })
                .collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), 40);
            assert_eq!(session.snapshot().files_processed, 40);
        }
    }

    #[test]
    fn test_no_files_reports_error() {
        let dir = TempDir::new().unwrap();
        let session = ProcessingSession::new(ExtensionLister::default(), config(2));

        let mut sink = RecordingSink::default();
        let outcome = session.start(dir.path(), true).unwrap().drain_into(&mut sink);
        session.join();

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(
            sink.seen,
            vec![Seen::Error(
                "No files".to_string(),
                "No text files found in the selected directory".to_string()
            )]
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        let lister = move |_: &Path, _: bool| -> Vec<PathBuf> {
            let _ = release_rx.recv();
            Vec::new()
        };
        let session = ProcessingSession::new(lister, config(1));

        let stream = session.start("/anywhere", false).unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert!(matches!(
            session.start("/anywhere", false),
            Err(SessionError::AlreadyRunning)
        ));

        drop(release_tx);
        let outcome = stream.drain_into(&mut RecordingSink::default());
        session.join();

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_restart_after_completion() {
        let dir = fixture(3);
        let session = ProcessingSession::new(ExtensionLister::default(), config(2));

        for _ in 0..2 {
            let outcome = session
                .start(dir.path(), false)
                .unwrap()
                .drain_into(&mut RecordingSink::default());
            assert_eq!(outcome, SessionOutcome::Completed);
            // Aggregate is reset per session, not accumulated across them
            assert_eq!(session.snapshot().files_processed, 3);
        }
        session.join();
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let session = ProcessingSession::with_defaults();
        session.cancel();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_cancel_after_first_file() {
        let dir = fixture(300);
        let session = ProcessingSession::new(
            ExtensionLister::default(),
            SessionConfig {
                pool_size: 1,
                event_capacity: 1,
                ..SessionConfig::default()
            },
        );

        let mut stream = session.start(dir.path(), false).unwrap();
        let mut saw_complete = false;

        for event in stream.by_ref() {
            match event {
                SessionEvent::FileProcessed { .. } => {
                    session.cancel();
                    break;
                }
                SessionEvent::Complete(_) => saw_complete = true,
                _ => {}
            }
        }

        let begin = Instant::now();
        for event in stream {
            if let SessionEvent::Complete(_) = event {
                saw_complete = true;
            }
        }
        session.join();

        assert!(begin.elapsed() < DEFAULT_CANCEL_GRACE);
        assert!(!saw_complete);
        assert_eq!(session.state(), SessionState::Idle);

        let partial = session.snapshot();
        assert!(partial.files_processed >= 1);
        assert!(partial.files_processed < 300);
        assert_eq!(partial.files_processed, partial.records.len() as u64);
    }

    #[test]
    fn test_snapshot_during_run_is_consistent() {
        let dir = fixture(200);
        let session = Arc::new(ProcessingSession::new(ExtensionLister::default(), config(4)));
        let stream = session.start(dir.path(), false).unwrap();

        let reader = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                while session.is_running() {
                    let stats = session.snapshot();
                    assert_eq!(stats.files_processed, stats.records.len() as u64);
                    let words: u64 = stats.records.iter().map(|r| r.word_count).sum();
                    assert_eq!(stats.total_word_count, words);
                }
            })
        };

        let outcome = stream.drain_into(&mut RecordingSink::default());
        reader.join().unwrap();
        session.join();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(session.snapshot().files_processed, 200);
    }

    #[test]
    fn test_unreadable_file_does_not_abort_batch() {
        let dir = fixture(3);
        let missing = dir.path().join("vanished.txt");
        let mut paths: Vec<_> = (0..3)
            .map(|i| dir.path().join(format!("doc{:03}.txt", i)))
            .collect();
        paths.push(missing);

        let lister = move |_: &Path, _: bool| paths.clone();
        let session = ProcessingSession::new(lister, config(2));
        let outcome = session
            .start(dir.path(), false)
            .unwrap()
            .drain_into(&mut RecordingSink::default());
        session.join();

        assert_eq!(outcome, SessionOutcome::Completed);
        let stats = session.snapshot();
        assert_eq!(stats.files_processed, 4);
        assert_eq!(stats.failed_files(), 1);
        assert_eq!(stats.total_word_count, 21);
        assert_eq!(stats.longest_word_seen, "looking");
    }

    #[test]
    fn test_cancel_while_start_is_resetting() {
        let dir = fixture(60);
        let session = Arc::new(ProcessingSession::new(ExtensionLister::default(), config(1)));

        // A held read lock stalls start() at the aggregate reset, after Running
        let guard = session.shared.aggregator.read().unwrap();
        let starter = {
            let session = Arc::clone(&session);
            let path = dir.path().to_path_buf();
            thread::spawn(move || session.start(path, false).unwrap())
        };

        while session.state() != SessionState::Running {
            thread::yield_now();
        }
        session.cancel();
        drop(guard);

        let processed = starter
            .join()
            .unwrap()
            .filter(|e| matches!(e, SessionEvent::FileProcessed { .. }))
            .count();
        session.join();

        assert_eq!(processed, 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.snapshot().files_processed, 0);
    }

    #[test]
    fn test_complete_describes_its_own_run_under_restarts() {
        let dir = fixture(3);
        let session = Arc::new(ProcessingSession::new(ExtensionLister::default(), config(2)));

        let runners: Vec<_> = (0..2)
            .map(|_| {
                let session = Arc::clone(&session);
                let path = dir.path().to_path_buf();
                thread::spawn(move || {
                    let mut runs = 0;
                    while runs < 25 {
                        match session.start(&path, false) {
                            Ok(stream) => {
                                for event in stream {
                                    if let SessionEvent::Complete(stats) = event {
                                        assert_eq!(stats.files_processed, 3);
                                        assert_eq!(stats.total_word_count, 21);
                                    }
                                }
                                runs += 1;
                            }
                            Err(SessionError::AlreadyRunning) => thread::yield_now(),
                            Err(e) => panic!("unexpected start failure: {}", e),
                        }
                    }
                })
            })
            .collect();

        for runner in runners {
            runner.join().unwrap();
        }
        session.join();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_panicking_lister_reports_error() {
        let lister = |_: &Path, _: bool| -> Vec<PathBuf> { panic!("lister failed") };
        let session = ProcessingSession::new(lister, config(1));

        let mut sink = RecordingSink::default();
        let outcome = session.start("/anywhere", false).unwrap().drain_into(&mut sink);
        session.join();

        assert_eq!(outcome, SessionOutcome::Failed);
        assert!(matches!(&sink.seen[..], [Seen::Error(context, _)] if context == "File discovery"));
        assert_eq!(session.state(), SessionState::Idle);

        // Still usable afterwards
        assert!(session.start("/anywhere", false).is_ok());
        session.join();
    }

    #[test]
    fn test_dropped_stream_still_aggregates() {
        let dir = fixture(10);
        let session = ProcessingSession::new(ExtensionLister::default(), config(2));

        drop(session.start(dir.path(), false).unwrap());
        session.join();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.snapshot().files_processed, 10);
    }
}
