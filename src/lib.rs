//! A poll-based file follower that delivers each newly appended line to a
//! consumer, in the spirit of `tail -f`.
//!
//! A [`TailSession`] owns a read cursor and runs its polling loop as a Tokio
//! task. Every interval it compares the file length with the cursor, resets
//! on truncation or rotation, and hands each complete line, with the byte
//! offset just past it, to the bound [`Sink`].
//!
//! # Example
//!
//! ```rust,no_run
//! use file_tailer::{TailConfig, TailSession, WriterSink};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TailConfig::new("app.log").with_poll_interval(Duration::from_secs(1));
//!     let mut session = TailSession::new(config);
//!     session.bind_sink(WriterSink::stdout())?;
//!     session.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.stop();
//!     session.join().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod poller;
mod reader;
mod sink;
mod stream;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{DEFAULT_POLL_INTERVAL, FailurePolicy, StartMode, TailConfig};
pub use error::{Error, Result};
pub use poller::{SessionState, StopHandle, TailSession};
pub use reader::Line;
pub use sink::{ChannelSink, FanOutSink, Sink, TailEvent, WriterSink};
pub use stream::LineStream;

use std::path::Path;
use std::time::Duration;

/// Follows `path` from its current end, yielding every line appended after
/// the call.
///
/// # Example
///
/// ```rust,no_run
/// use file_tailer::follow;
/// use std::time::Duration;
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut lines = follow("app.log", Duration::from_millis(500))?;
///
///     while let Some(line) = lines.next().await {
///         println!("{}: {}", line.offset, line.text);
///     }
///
///     Ok(())
/// }
/// ```
pub fn follow<P: AsRef<Path>>(path: P, poll_interval: Duration) -> Result<LineStream> {
    LineStream::open(TailConfig::new(path).with_poll_interval(poll_interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_follow_starts_at_end() {
        let temp = TempLogFile::with_content("already there\n").unwrap();
        let mut lines = follow(temp.path(), Duration::from_millis(20)).unwrap();

        temp.append_line("fresh").unwrap();

        let line = tokio::time::timeout(Duration::from_secs(2), lines.next())
            .await
            .unwrap();
        assert_eq!(line, Some(Line::new("fresh", 20)));
    }
}
