//! The transport seam.
//!
//! A [`Transport`] is one socket handle of the underlying messaging layer:
//! non-blocking single-frame send and receive, readiness sampling, and
//! edge-triggered readiness notification. Routing, framing on the wire and
//! pattern state machines all live behind this trait; the engine in
//! [`socket`](crate::socket) only moves frames and enforces message
//! boundaries.

use bytes::Bytes;
use tracing::trace;

use crate::error::Result;
use crate::frame::{Frame, SendFlags};
use crate::gate::Readiness;
use crate::options::{OptionValue, SocketOption};
use crate::socket_type::SocketType;

/// Outcome of a single-frame send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The frame was accepted.
    Sent,
    /// The frame cannot be accepted right now; retry after a writable edge.
    WouldBlock,
}

/// Channel end a transport uses to report readiness edges to its socket.
///
/// Notifications are queued and delivered to the socket on its next
/// [`process_ready`](crate::socket::Socket::process_ready) or
/// [`ready`](crate::socket::Socket::ready) call, never from inside the
/// transport call that caused them.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    tx: flume::Sender<Readiness>,
}

impl ReadyNotifier {
    /// Wrap the sending half of a readiness channel.
    #[must_use]
    pub const fn new(tx: flume::Sender<Readiness>) -> Self {
        Self { tx }
    }

    /// Report a rising edge. Edges with nothing ready are ignored.
    ///
    /// Returns `false` once the socket side is gone.
    pub fn notify(&self, readiness: Readiness) -> bool {
        if !readiness.any() {
            return true;
        }
        let delivered = self.tx.send(readiness).is_ok();
        if !delivered {
            trace!("readiness edge dropped, socket is gone");
        }
        delivered
    }

    /// Whether the socket side still listens.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_disconnected()
    }
}

/// A non-blocking socket handle of the underlying messaging layer.
///
/// All methods must return promptly. Anything that cannot be done right now
/// is reported as [`SendStatus::WouldBlock`] or `Ok(None)`, and the transport
/// later reports the matching rising edge through its [`ReadyNotifier`].
pub trait Transport: 'static {
    /// Messaging pattern of this handle.
    fn socket_type(&self) -> SocketType;

    /// Install the notifier for readiness edges. Called once by the socket
    /// that takes ownership of the transport.
    fn set_notifier(&mut self, notifier: ReadyNotifier);

    /// Level-triggered readiness sample.
    fn readiness(&self) -> Readiness;

    /// Tell the transport whether the socket has complete messages waiting.
    ///
    /// While set, the transport should report a writable edge as soon as it
    /// can accept frames again.
    fn set_write_interest(&mut self, pending: bool);

    /// Offer one frame. `flags.more()` says whether further frames of the
    /// same message follow.
    ///
    /// # Errors
    ///
    /// Any hard failure for the message this frame belongs to. The transport
    /// discards frames of that message it already accepted.
    fn send_frame(&mut self, frame: &Frame, flags: SendFlags) -> Result<SendStatus>;

    /// Take the next received frame, if any.
    ///
    /// # Errors
    ///
    /// Receive failures; the engine reports them and stops the current drain.
    fn recv_frame(&mut self) -> Result<Option<Bytes>>;

    /// Whether the frame last returned by [`recv_frame`](Self::recv_frame)
    /// is followed by more frames of the same message.
    fn has_more(&self) -> bool;

    /// Bind to a local endpoint.
    ///
    /// # Errors
    ///
    /// Invalid or busy endpoint.
    fn bind(&mut self, endpoint: &str) -> Result<()>;

    /// Stop listening on a bound endpoint.
    ///
    /// # Errors
    ///
    /// Endpoint not bound by this handle.
    fn unbind(&mut self, endpoint: &str) -> Result<()>;

    /// Connect to a remote endpoint.
    ///
    /// # Errors
    ///
    /// Invalid or unreachable endpoint.
    fn connect(&mut self, endpoint: &str) -> Result<()>;

    /// Drop a connection made by [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Endpoint not connected by this handle.
    fn disconnect(&mut self, endpoint: &str) -> Result<()>;

    /// Apply an option.
    ///
    /// # Errors
    ///
    /// Unsupported option or a value of the wrong shape.
    fn set_option(&mut self, option: SocketOption, value: OptionValue) -> Result<()>;

    /// Read an option.
    ///
    /// # Errors
    ///
    /// Unsupported or write-only option.
    fn get_option(&self, option: SocketOption) -> Result<OptionValue>;

    /// Release the handle. Pending inbound and outbound data is dropped.
    fn close(&mut self);
}
