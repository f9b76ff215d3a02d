//! `futures` adapters for receive-only and send-only sockets.
//!
//! [`MessageStream`] turns a PULL, SUB or XSUB socket into a
//! `Stream<Item = Result<Message>>`. It pauses the socket, so messages are
//! no longer emitted as events, and pulls them with `read()` whenever a
//! readiness edge arrives.
//!
//! [`MessageSink`] turns a PUSH, PUB or XPUB socket into a `Sink`. Items go
//! through the regular send path; flushing waits for writable edges until
//! the outbound queue is empty.
//!
//! # Examples
//!
//! ```no_run
//! use flowsock::prelude::*;
//! use futures::{SinkExt, StreamExt};
//!
//! # async fn example() -> flowsock::Result<()> {
//! let pull = flowsock::socket(SocketType::Pull)?;
//! pull.bind("inproc://jobs")?;
//! let push = flowsock::socket(SocketType::Push)?;
//! push.connect("inproc://jobs")?;
//!
//! let mut sink = MessageSink::new(push)?;
//! let mut stream = MessageStream::new(pull)?;
//!
//! sink.send("job-1").await?;
//! let msg = stream.next().await.transpose()?;
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::sink::Sink;
use futures::stream::{LocalBoxStream, Stream, StreamExt};
use tracing::trace;

use flowsock_core::error::{Error, Result};
use flowsock_core::frame::Parts;
use flowsock_core::gate::Readiness;
use flowsock_core::message::Message;
use flowsock_core::socket::Socket;
use flowsock_core::transport::Transport;

/// Readiness edges of one socket, as a pollable stream.
fn edges<T: Transport>(socket: &Socket<T>) -> LocalBoxStream<'static, Readiness> {
    socket.readiness_receiver().into_stream().boxed_local()
}

/// Pull-based reader over a receive-only socket.
pub struct MessageStream<T: Transport> {
    socket: Socket<T>,
    edges: LocalBoxStream<'static, Readiness>,
}

impl<T: Transport> MessageStream<T> {
    /// Wrap `socket` and pause its event delivery.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the socket is PULL, SUB or XSUB.
    pub fn new(socket: Socket<T>) -> Result<Self> {
        let socket_type = socket.socket_type();
        if !socket_type.is_readable_only() {
            return Err(Error::Unsupported {
                op: "stream",
                socket_type,
            });
        }
        socket.pause();
        let edges = edges(&socket);
        Ok(Self { socket, edges })
    }

    /// Get a reference to the underlying socket.
    pub fn get_ref(&self) -> &Socket<T> {
        &self.socket
    }

    /// Get a mutable reference to the underlying socket.
    pub fn get_mut(&mut self) -> &mut Socket<T> {
        &mut self.socket
    }

    /// Consume the adapter and return the socket, still paused.
    pub fn into_inner(self) -> Socket<T> {
        self.socket
    }
}

impl<T: Transport> Stream for MessageStream<T> {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.socket.read() {
                Ok(Some(msg)) => return Poll::Ready(Some(Ok(msg))),
                Err(e) => return Poll::Ready(Some(Err(e))),
                Ok(None) if this.socket.is_closed() => return Poll::Ready(None),
                Ok(None) => {}
            }

            // Nothing buffered: wait for the next edge, then read again.
            match this.edges.poll_next_unpin(cx) {
                Poll::Ready(Some(readiness)) => {
                    trace!("[{}] stream woke on {:?}", this.socket.socket_type(), readiness);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Push-based writer over a send-only socket.
pub struct MessageSink<T: Transport> {
    socket: Socket<T>,
    edges: LocalBoxStream<'static, Readiness>,
    high_water: usize,
}

impl<T: Transport> MessageSink<T> {
    /// Queued messages above which `poll_ready` waits for the queue to drain.
    pub const DEFAULT_HIGH_WATER: usize = 1000;

    /// Wrap `socket`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the socket is PUSH, PUB or XPUB.
    pub fn new(socket: Socket<T>) -> Result<Self> {
        let socket_type = socket.socket_type();
        if !socket_type.is_writable_only() {
            return Err(Error::Unsupported {
                op: "sink",
                socket_type,
            });
        }
        let edges = edges(&socket);
        Ok(Self {
            socket,
            edges,
            high_water: Self::DEFAULT_HIGH_WATER,
        })
    }

    /// Change how many queued messages `poll_ready` tolerates.
    #[must_use]
    pub fn with_high_water(mut self, messages: usize) -> Self {
        self.high_water = messages.max(1);
        self
    }

    /// Get a reference to the underlying socket.
    pub fn get_ref(&self) -> &Socket<T> {
        &self.socket
    }

    /// Get a mutable reference to the underlying socket.
    pub fn get_mut(&mut self) -> &mut Socket<T> {
        &mut self.socket
    }

    /// Consume the adapter and return the socket.
    pub fn into_inner(self) -> Socket<T> {
        self.socket
    }

    /// Apply edges until fewer than `limit` complete messages are queued.
    ///
    /// A message left open with `SNDMORE` is not counted; it cannot leave
    /// until its last part is sent.
    fn poll_queue_below(&mut self, cx: &mut Context<'_>, limit: usize) -> Poll<Result<()>> {
        loop {
            if self.socket.is_closed() {
                return Poll::Ready(Err(Error::SocketClosed));
            }
            if self.socket.sendable_batches() < limit {
                return Poll::Ready(Ok(()));
            }
            match self.edges.poll_next_unpin(cx) {
                Poll::Ready(Some(readiness)) => self.socket.on_ready(readiness)?,
                Poll::Ready(None) => return Poll::Ready(Err(Error::SocketClosed)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T: Transport, P: Into<Parts>> Sink<P> for MessageSink<T> {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        let limit = this.high_water;
        this.poll_queue_below(cx, limit)
    }

    fn start_send(self: Pin<&mut Self>, item: P) -> Result<()> {
        self.get_mut().socket.send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.get_mut().poll_queue_below(cx, 1)
    }

    /// Flushes; the socket stays open.
    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.get_mut().poll_queue_below(cx, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsock_core::socket_type::SocketType;
    use flowsock_inproc::Context as InprocContext;

    #[test]
    fn test_stream_rejects_send_only_types() {
        let ctx = InprocContext::new();
        let push = Socket::new(ctx.socket(SocketType::Push).unwrap());
        assert!(matches!(
            MessageStream::new(push),
            Err(Error::Unsupported { op: "stream", .. })
        ));
    }

    #[test]
    fn test_sink_rejects_receive_types() {
        let ctx = InprocContext::new();
        let dealer = Socket::new(ctx.socket(SocketType::Dealer).unwrap());
        assert!(matches!(
            MessageSink::new(dealer),
            Err(Error::Unsupported { op: "sink", .. })
        ));
    }

    #[test]
    fn test_stream_pauses_socket() {
        let ctx = InprocContext::new();
        let pull = Socket::new(ctx.socket(SocketType::Pull).unwrap());
        let stream = MessageStream::new(pull).unwrap();
        assert!(stream.get_ref().is_paused());
    }
}
