//! Consumers of tailed lines.

use crate::error::{Error, Result};
use crate::reader::Line;
use std::io::Write;
use tokio::sync::mpsc;

/// Receives the lines of a single session, in file order.
///
/// Both methods are called on the polling task itself; a sink that blocks
/// stalls the session.
pub trait Sink: Send + 'static {
    /// Accept one complete line and the byte offset just past it.
    fn deliver(&mut self, line: &str, offset: u64) -> Result<()>;

    /// Called exactly once when the session ends, after the last `deliver`.
    fn on_stop(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn deliver(&mut self, line: &str, offset: u64) -> Result<()> {
        (**self).deliver(line, offset)
    }

    fn on_stop(&mut self) -> Result<()> {
        (**self).on_stop()
    }
}

/// Event forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    Line(Line),
    Stopped,
}

/// Forwards every line, then a final [`TailEvent::Stopped`], into a channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TailEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<TailEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TailEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Sink for ChannelSink {
    fn deliver(&mut self, line: &str, offset: u64) -> Result<()> {
        self.tx
            .send(TailEvent::Line(Line::new(line, offset)))
            .map_err(|_| Error::sink("receiver dropped"))
    }

    fn on_stop(&mut self) -> Result<()> {
        self.tx
            .send(TailEvent::Stopped)
            .map_err(|_| Error::sink("receiver dropped"))
    }
}

/// Composite sink forwarding each call to every sub-sink in order.
///
/// A failing sub-sink does not prevent the others from being called; the
/// first error is returned once all have run.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Sink>(mut self, sink: S) -> Self {
        self.push(sink);
        self
    }

    pub fn push<S: Sink>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn for_each(&mut self, mut f: impl FnMut(&mut dyn Sink) -> Result<()>) -> Result<()> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = f(sink.as_mut()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Sink for FanOutSink {
    fn deliver(&mut self, line: &str, offset: u64) -> Result<()> {
        self.for_each(|sink| sink.deliver(line, offset))
    }

    fn on_stop(&mut self) -> Result<()> {
        self.for_each(|sink| sink.on_stop())
    }
}

/// Writes each line followed by `\n` to any [`Write`]r, flushing per line.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> Sink for WriterSink<W> {
    fn deliver(&mut self, line: &str, _offset: u64) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn on_stop(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
