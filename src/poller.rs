//! The polling engine: one background task per session that follows a file
//! by comparing its length to a cursor.
//!
//! Each pass stats the file, resets the cursor when the file shrank
//! (truncation or rotation), reads the bytes appended since the last pass and
//! hands every complete line to the bound [`Sink`]. A partial trailing line
//! stays in the file until its terminator arrives.

use crate::config::{FailurePolicy, StartMode, TailConfig};
use crate::error::{Error, Result};
use crate::reader::{Line, calculate_bytes_to_read, detect_file_truncation, read_new_lines};
use crate::sink::Sink;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`TailSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Stopped,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::NotStarted => 0,
            SessionState::Running => 1,
            SessionState::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::NotStarted,
            1 => SessionState::Running,
            _ => SessionState::Stopped,
        }
    }
}

/// State shared between the caller and the polling task.
#[derive(Debug)]
struct Shared {
    stop_requested: AtomicBool,
    state: AtomicU8,
    cursor: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            state: AtomicU8::new(SessionState::NotStarted.as_u8()),
            cursor: AtomicU64::new(0),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Cloneable handle that can stop a session from any thread or task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Request termination. Observed at the top of the next loop iteration.
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested()
    }
}

/// A file being followed: configuration, the bound sink and the polling task.
///
/// Rotation is detected when the file shrinks, disappears, or (on unix) when
/// the path starts naming a different file than the open handle. Elsewhere a
/// rename rotation whose new file already outgrew the cursor goes unnoticed.
///
/// Dropping a started session requests it to stop.
pub struct TailSession {
    config: TailConfig,
    sink: Option<Box<dyn Sink>>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<Result<()>>>,
}

impl TailSession {
    pub fn new(config: TailConfig) -> Self {
        Self {
            config,
            sink: None,
            shared: Arc::new(Shared::new()),
            task: None,
        }
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Bind the consumer of this session's lines. Replaces any earlier sink.
    pub fn bind_sink<S: Sink>(&mut self, sink: S) -> Result<()> {
        if self.shared.state() != SessionState::NotStarted {
            return Err(Error::AlreadyStarted);
        }
        self.sink = Some(Box::new(sink));
        Ok(())
    }

    /// Spawn the polling loop on the current Tokio runtime and return
    /// immediately.
    ///
    /// The starting cursor is fixed here, before the task runs, so lines
    /// appended right after `start` returns are never skipped. A missing file
    /// starts at zero; any other stat failure is returned.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.state() != SessionState::NotStarted {
            return Err(Error::AlreadyStarted);
        }
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()?;
        if self.sink.is_none() {
            return Err(Error::SinkNotBound);
        }
        let cursor = initial_cursor(&self.config)?;
        let sink = self.sink.take().ok_or(Error::SinkNotBound)?;

        self.shared.cursor.store(cursor, Ordering::Release);
        self.shared.set_state(SessionState::Running);
        let config = self.config.clone();
        let shared = Arc::clone(&self.shared);
        self.task = Some(runtime.spawn(poll_loop(config, cursor, sink, shared)));
        Ok(())
    }

    /// Request graceful termination. Idempotent; may be called before start.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Byte offset up to which the file has been consumed, as of the last
    /// completed pass.
    pub fn cursor(&self) -> u64 {
        self.shared.cursor.load(Ordering::Acquire)
    }

    /// Wait for the polling loop to exit and return how it ended.
    pub async fn join(&mut self) -> Result<()> {
        let task = self.task.take().ok_or(Error::NotStarted)?;
        task.await?
    }
}

impl Drop for TailSession {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop();
        }
    }
}

/// Per-session loop state; owns the file handle and the cursor.
struct Poller {
    path: PathBuf,
    interval: Duration,
    policy: FailurePolicy,
    file: Option<File>,
    /// Identity of the file the cursor belongs to; survives a dropped handle.
    identity: Option<(u64, u64)>,
    cursor: u64,
    failures: u32,
    missing: bool,
}

impl Poller {
    async fn open(config: &TailConfig, cursor: u64) -> Self {
        let mut poller = Self {
            path: config.path.clone(),
            interval: config.poll_interval,
            policy: config.failure_policy,
            file: None,
            identity: None,
            cursor,
            failures: 0,
            missing: false,
        };
        poller.file = poller.open_handle().await.ok();
        poller
    }

    /// Open the path and remember which file the handle refers to.
    async fn open_handle(&mut self) -> Result<File> {
        let file = File::open(&self.path).await?;
        self.identity = file_identity(&file.metadata().await?);
        Ok(file)
    }

    async fn run(&mut self, sink: &mut dyn Sink, shared: &Shared) -> Result<()> {
        loop {
            if shared.stop_requested() {
                debug!(path = %self.path.display(), "stop requested");
                return Ok(());
            }

            let outcome = self.poll_once(sink).await;
            self.settle(outcome)?;
            shared.cursor.store(self.cursor, Ordering::Release);

            if self.interval.is_zero() {
                debug!(path = %self.path.display(), "single pass complete");
                return Ok(());
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Classify the outcome of a pass. Only an exhausted failure policy, or a
    /// non-I/O error, ends the loop.
    fn settle(&mut self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.failures = 0;
                Ok(())
            }
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                self.file_vanished();
                Ok(())
            }
            Err(Error::Io(e)) => {
                // The handle may be what is broken; reopen the path next pass
                self.file = None;
                self.failures += 1;
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    failures = self.failures,
                    "failed to read file"
                );
                if self.policy.should_give_up(self.failures) {
                    return Err(Error::TooManyFailures {
                        attempts: self.failures,
                        last: e,
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// One stat/read pass.
    async fn poll_once(&mut self, sink: &mut dyn Sink) -> Result<()> {
        let meta = tokio::fs::metadata(&self.path).await?;
        let len = meta.len();
        if self.missing {
            self.missing = false;
            info!(path = %self.path.display(), len, "file reappeared");
        }

        let replaced = self.identity.is_some() && file_identity(&meta) != self.identity;

        if replaced || detect_file_truncation(len, self.cursor) {
            debug!(
                path = %self.path.display(),
                len,
                cursor = self.cursor,
                replaced,
                "file rotated, reopening from start"
            );
            self.file = None;
            self.cursor = 0;
            self.file = Some(self.open_handle().await?);
        }

        if calculate_bytes_to_read(len, self.cursor).is_none() {
            return Ok(());
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => self.open_handle().await?,
        };
        let file = self.file.insert(file);

        let outcome = read_new_lines(file, self.cursor, len).await?;
        debug!(
            path = %self.path.display(),
            lines = outcome.lines.len(),
            cursor = outcome.cursor,
            "read pass"
        );
        for line in &outcome.lines {
            deliver_line(sink, line);
        }
        self.cursor = outcome.cursor;
        Ok(())
    }

    /// A missing file reads as length zero: the next file at this path is a
    /// new generation and is read from its start.
    fn file_vanished(&mut self) {
        if !self.missing {
            self.missing = true;
            warn!(path = %self.path.display(), "file missing, waiting for it to reappear");
        }
        self.file = None;
        self.identity = None;
        self.cursor = 0;
    }

    fn release(&mut self) {
        self.file = None;
    }
}

/// Device and inode of a file, where the platform exposes them.
#[cfg(unix)]
fn file_identity(meta: &std::fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(_meta: &std::fs::Metadata) -> Option<(u64, u64)> {
    None
}

/// Cursor for a new session: zero, or the current length when starting from
/// the end.
fn initial_cursor(config: &TailConfig) -> Result<u64> {
    match config.start_mode {
        StartMode::FromBeginning => Ok(0),
        StartMode::FromEnd => match std::fs::metadata(&config.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        },
    }
}

async fn poll_loop(
    config: TailConfig,
    cursor: u64,
    mut sink: Box<dyn Sink>,
    shared: Arc<Shared>,
) -> Result<()> {
    let mut poller = Poller::open(&config, cursor).await;
    info!(
        path = %config.path.display(),
        interval = ?config.poll_interval,
        mode = ?config.start_mode,
        cursor = poller.cursor,
        "tail session started"
    );

    let outcome = poller.run(sink.as_mut(), &shared).await;
    if let Err(e) = &outcome {
        error!(path = %config.path.display(), error = %e, "tail session failed");
    }

    notify_stop(sink.as_mut(), &config.path);
    poller.release();
    shared.set_state(SessionState::Stopped);
    info!(path = %config.path.display(), cursor = poller.cursor, "tail session stopped");

    outcome
}

/// Hand one line to the sink. Errors and panics are logged, never propagated.
fn deliver_line(sink: &mut dyn Sink, line: &Line) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(&line.text, line.offset))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(offset = line.offset, error = %e, "sink rejected line"),
        Err(_) => warn!(offset = line.offset, "sink panicked while delivering line"),
    }
}

fn notify_stop(sink: &mut dyn Sink, path: &Path) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.on_stop())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(path = %path.display(), error = %e, "sink failed on stop"),
        Err(_) => warn!(path = %path.display(), "sink panicked on stop"),
    }
}
