//! Stream adapter yielding the lines of a tail session.

use crate::config::TailConfig;
use crate::error::Result;
use crate::poller::{StopHandle, TailSession};
use crate::reader::Line;
use crate::sink::{ChannelSink, TailEvent};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A stream over the lines of a running [`TailSession`].
///
/// The stream ends once the session stops. Dropping it stops the session.
pub struct LineStream {
    events: UnboundedReceiverStream<TailEvent>,
    session: TailSession,
    finished: bool,
}

impl LineStream {
    /// Starts a session for `config` bound to a channel and wraps its output.
    pub fn open(config: TailConfig) -> Result<Self> {
        let (sink, rx) = ChannelSink::channel();
        let mut session = TailSession::new(config);
        session.bind_sink(sink)?;
        session.start()?;

        Ok(LineStream {
            events: UnboundedReceiverStream::new(rx),
            session,
            finished: false,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.session.stop_handle()
    }

    /// Stop the session and wait for it to exit. Lines already read stay
    /// available on the stream.
    pub async fn close(&mut self) -> Result<()> {
        self.session.stop();
        self.session.join().await
    }
}

impl Stream for LineStream {
    type Item = Line;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut self.events).poll_next(cx) {
            Poll::Ready(Some(TailEvent::Line(line))) => Poll::Ready(Some(line)),
            Poll::Ready(Some(TailEvent::Stopped)) | Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
