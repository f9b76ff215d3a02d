//! The socket engine.
//!
//! [`Socket`] owns one [`Transport`] handle and runs two drain loops over it:
//!
//! - the send drain pulls closed batches off the [`OutboundQueue`] and
//!   offers their frames to the transport until it pushes back;
//! - the receive drain pulls frames, assembles complete multipart messages
//!   and hands each one to the `message` handlers as soon as it is complete.
//!
//! Both loops are entered through the [`ReadinessGate`], from four places:
//! readiness edges, `send`, `resume`, and `bind`/`unbind` completion. A loop
//! that is already running further up the stack is never entered twice, so
//! handlers and send callbacks may call back into the socket freely.
//!
//! ## Threading
//!
//! A socket is single-threaded (`!Send`). Cloning a `Socket` clones a handle
//! to the same socket. Readiness edges are queued by the transport and
//! applied by [`Socket::process_ready`] or awaited with [`Socket::ready`].
//!
//! ## Errors
//!
//! A hard send failure goes to the send callbacks of the failed message. If
//! there are none, and for receive failures, the error is emitted as an
//! `error` event; with no `error` handler registered it is returned to the
//! caller of whatever started the drain.
//!
//! A receive failure only stops the receive drain. When both drains run
//! together the send drain still runs and the first failure is returned.
//! An oversized message that reaches an `error` handler is skipped and
//! draining continues. Any other failure ends the drain, and if the
//! transport is still readable a fresh readable edge is queued for the next
//! round.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::assembler::MultipartAssembler;
use crate::batch::{OutboundBatch, SendCallback};
use crate::error::{Error, Result};
use crate::events::{EventKind, ListenerId, Listeners, SocketEvent};
use crate::frame::{Parts, SendFlags};
use crate::gate::{Direction, Readiness, ReadinessGate};
use crate::message::Message;
use crate::options::{OptionValue, SocketOption};
use crate::queue::OutboundQueue;
use crate::socket_type::SocketType;
use crate::transport::{ReadyNotifier, SendStatus, Transport};

/// `ZMQ_EVENTS` bit for a readable socket.
pub const POLLIN: i64 = 1;
/// `ZMQ_EVENTS` bit for a writable socket.
pub const POLLOUT: i64 = 2;

struct Inner<T: Transport> {
    socket_type: SocketType,
    transport: RefCell<T>,
    outgoing: RefCell<OutboundQueue<Socket<T>>>,
    gate: ReadinessGate,
    assembler: RefCell<MultipartAssembler>,
    listeners: Listeners<Socket<T>>,
    ready_tx: flume::Sender<Readiness>,
    ready_rx: flume::Receiver<Readiness>,
}

/// Non-blocking message socket over a transport handle.
pub struct Socket<T: Transport> {
    inner: Rc<Inner<T>>,
}

impl<T: Transport> Clone for Socket<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Socket<T> {
    /// Take ownership of `transport` and install the readiness channel.
    pub fn new(mut transport: T) -> Self {
        let (tx, ready_rx) = flume::unbounded();
        transport.set_notifier(ReadyNotifier::new(tx.clone()));
        let socket_type = transport.socket_type();

        debug!("[{}] socket created", socket_type);

        Self {
            inner: Rc::new(Inner {
                socket_type,
                transport: RefCell::new(transport),
                outgoing: RefCell::new(OutboundQueue::new()),
                gate: ReadinessGate::new(),
                assembler: RefCell::new(MultipartAssembler::default()),
                listeners: Listeners::new(),
                ready_tx: tx,
                ready_rx,
            }),
        }
    }

    /// Messaging pattern.
    #[inline]
    #[must_use]
    pub fn socket_type(&self) -> SocketType {
        self.inner.socket_type
    }

    /// Whether both drain loops are suspended.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.gate.is_paused()
    }

    /// Whether [`close`](Self::close) was called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.gate.is_closed()
    }

    /// Batches waiting in the outbound queue, including an unfinished one.
    #[must_use]
    pub fn queued_batches(&self) -> usize {
        self.inner.outgoing.borrow().len()
    }

    /// Complete messages waiting in the outbound queue.
    #[must_use]
    pub fn sendable_batches(&self) -> usize {
        self.inner.outgoing.borrow().closed_len()
    }

    /// Frames waiting in the outbound queue.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.inner.outgoing.borrow().pending_frames()
    }

    /// Readiness edges applied so far.
    #[must_use]
    pub fn edges_seen(&self) -> u64 {
        self.inner.gate.edges_seen()
    }

    /// Whether `self` and `other` are handles to the same socket.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` with shared access to the transport.
    ///
    /// # Panics
    ///
    /// If called from inside a transport method.
    pub fn with_transport<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.transport.borrow())
    }

    // ---------------------------------------------------------------------
    // Sending
    // ---------------------------------------------------------------------

    /// Send one frame or a multipart message.
    ///
    /// # Errors
    ///
    /// Closed socket, a pattern that cannot send, or a send failure with no
    /// `error` handler registered.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// socket.send("hello")?;
    /// socket.send(["key", "value"])?;
    /// ```
    pub fn send(&self, parts: impl Into<Parts>) -> Result<()> {
        self.enqueue(parts.into(), SendFlags::NONE, None)
    }

    /// Send with explicit flags for the last part.
    ///
    /// With [`SendFlags::SNDMORE`] the message stays open and the next send
    /// continues it.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send).
    pub fn send_with(&self, parts: impl Into<Parts>, flags: SendFlags) -> Result<()> {
        self.enqueue(parts.into(), flags, None)
    }

    /// Send and get told when the message has left or failed.
    ///
    /// The callback is attached to the last part. A failure reported to a
    /// callback is not raised anywhere else.
    ///
    /// # Errors
    ///
    /// Closed socket or a pattern that cannot send. Failures of this message
    /// go to `callback` instead.
    pub fn send_with_callback<F>(
        &self,
        parts: impl Into<Parts>,
        flags: SendFlags,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(&Self, std::result::Result<(), &Error>) + 'static,
    {
        self.enqueue(parts.into(), flags, Some(Box::new(callback)))
    }

    fn enqueue(
        &self,
        parts: Parts,
        flags: SendFlags,
        mut callback: Option<SendCallback<Self>>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SocketClosed);
        }
        if !self.inner.socket_type.can_send() {
            return Err(Error::Unsupported {
                op: "send",
                socket_type: self.inner.socket_type,
            });
        }
        if parts.is_empty() {
            return Ok(());
        }

        let count = parts.len();
        {
            let mut outgoing = self.inner.outgoing.borrow_mut();
            let last = count - 1;
            for (i, (frame, frame_flags)) in parts.with_flags(flags).enumerate() {
                let cb = if i == last { callback.take() } else { None };
                outgoing.append(frame, frame_flags, cb);
            }
        }

        trace!(
            "[{}] queued {} frames (more: {})",
            self.inner.socket_type,
            count,
            flags.more()
        );

        if self.inner.outgoing.borrow().can_send() {
            self.flush_writes()
        } else {
            Ok(())
        }
    }

    /// Enter the send drain, or just record pending work when the drain is
    /// refused.
    fn flush_writes(&self) -> Result<()> {
        if self.inner.gate.is_paused() || self.inner.gate.is_draining(Direction::Write) {
            let pending = self.inner.outgoing.borrow().can_send();
            self.inner.transport.borrow_mut().set_write_interest(pending);
            return Ok(());
        }
        self.drain_writes()
    }

    /// Move closed batches into the transport until it pushes back.
    fn drain_writes(&self) -> Result<()> {
        let Some(_guard) = self.inner.gate.enter(Direction::Write) else {
            return Ok(());
        };

        let mut delivered = 0usize;
        loop {
            // Callbacks run inside this loop and may pause or close the socket.
            if self.inner.gate.is_paused() || self.inner.gate.is_closed() {
                break;
            }

            let Some(mut batch) = self.inner.outgoing.borrow_mut().fetch() else {
                self.inner.transport.borrow_mut().set_write_interest(false);
                break;
            };

            match self.transmit(&mut batch) {
                Ok(SendStatus::Sent) => {
                    delivered += 1;
                    self.update_write_interest();
                    batch.invoke_sent(self);
                }
                Ok(SendStatus::WouldBlock) => {
                    trace!(
                        "[{}] transport full after {}/{} frames",
                        self.inner.socket_type,
                        batch.sent(),
                        batch.len()
                    );
                    self.inner.outgoing.borrow_mut().restore(batch);
                    self.inner.transport.borrow_mut().set_write_interest(true);
                    break;
                }
                Err(err) => {
                    debug!("[{}] send failed: {}", self.inner.socket_type, err);
                    self.update_write_interest();
                    if let Err(err) = batch.invoke_error(self, err) {
                        self.raise(err)?;
                    }
                    break;
                }
            }
        }

        if delivered > 0 {
            trace!(
                "[{}] send drain delivered {} messages",
                self.inner.socket_type,
                delivered
            );
        }
        Ok(())
    }

    /// Offer the batch's unsent frames in order.
    fn transmit(&self, batch: &mut OutboundBatch<Self>) -> Result<SendStatus> {
        let mut transport = self.inner.transport.borrow_mut();
        while let Some((frame, flags)) = batch.next_unsent() {
            match transport.send_frame(frame, flags)? {
                SendStatus::Sent => batch.mark_sent(),
                SendStatus::WouldBlock => return Ok(SendStatus::WouldBlock),
            }
        }
        Ok(SendStatus::Sent)
    }

    fn update_write_interest(&self) {
        let pending = self.inner.outgoing.borrow().can_send();
        self.inner.transport.borrow_mut().set_write_interest(pending);
    }

    // ---------------------------------------------------------------------
    // Receiving
    // ---------------------------------------------------------------------

    /// Deliver every complete message the transport holds.
    fn drain_reads(&self) -> Result<()> {
        let Some(_guard) = self.inner.gate.enter(Direction::Read) else {
            return Ok(());
        };

        let mut delivered = 0usize;
        loop {
            if self.inner.gate.is_paused() || self.inner.gate.is_closed() {
                break;
            }

            match self.read_message() {
                Ok(Some(msg)) => {
                    delivered += 1;
                    let handlers = self.inner.listeners.emit(self, &SocketEvent::Message(&msg));
                    if handlers == 0 {
                        trace!(
                            "[{}] message of {} frames had no handler",
                            self.inner.socket_type,
                            msg.len()
                        );
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    debug!("[{}] receive failed: {}", self.inner.socket_type, err);
                    // The assembler already dropped the offending message.
                    let skipped = matches!(
                        err,
                        Error::MessageTooLarge { .. } | Error::TooManyFrames { .. }
                    );
                    let raised = self.raise(err);
                    if skipped && raised.is_ok() {
                        continue;
                    }
                    self.inner.gate.defer_read();
                    raised?;
                    break;
                }
            }
        }

        if delivered > 0 {
            trace!(
                "[{}] receive drain delivered {} messages",
                self.inner.socket_type,
                delivered
            );
        }
        Ok(())
    }

    /// Queue a readable edge for input a failed receive drain left behind.
    ///
    /// The edge goes through the readiness channel, so it is applied by the
    /// next `process_ready` or `ready` rather than inside the current one.
    fn rearm_reads(&self) {
        if !self.inner.gate.take_deferred_read() || self.is_closed() {
            return;
        }
        if self.inner.transport.borrow().readiness().readable {
            trace!("[{}] re-arming receive drain", self.inner.socket_type);
            let _ = self.inner.ready_tx.send(Readiness::READABLE);
        }
    }

    /// Run both drains, the receive drain first. A failure in one does not
    /// skip the other; the first failure is returned.
    fn drain_both(&self) -> Result<()> {
        let read = self.drain_reads();
        let write = self.drain_writes();
        self.rearm_reads();
        read.and(write)
    }

    /// Pull frames until one message is complete or the transport runs dry.
    ///
    /// Frames of an unfinished message stay in the assembler.
    fn read_message(&self) -> Result<Option<Message>> {
        loop {
            let (frame, more) = {
                let mut transport = self.inner.transport.borrow_mut();
                match transport.recv_frame()? {
                    Some(frame) => (frame, transport.has_more()),
                    None => return Ok(None),
                }
            };

            if let Some(msg) = self.inner.assembler.borrow_mut().push_frame(frame, more)? {
                return Ok(Some(msg));
            }
        }
    }

    /// Pull one complete message, bypassing event delivery.
    ///
    /// Works while paused. Returns `Ok(None)` when no complete message is
    /// available or the socket is closed.
    ///
    /// # Errors
    ///
    /// A pattern that cannot receive, or a receive failure.
    pub fn read(&self) -> Result<Option<Message>> {
        if !self.inner.socket_type.can_recv() {
            return Err(Error::Unsupported {
                op: "read",
                socket_type: self.inner.socket_type,
            });
        }
        if self.is_closed() {
            return Ok(None);
        }
        self.read_message()
    }

    // ---------------------------------------------------------------------
    // Flow control
    // ---------------------------------------------------------------------

    /// Stop both drain loops. Sends still queue; readiness edges are ignored.
    pub fn pause(&self) {
        if !self.inner.gate.is_paused() {
            debug!("[{}] paused", self.inner.socket_type);
        }
        self.inner.gate.pause();
    }

    /// Restart both drain loops and catch up on what accumulated.
    ///
    /// Both drains always run, the receive drain first.
    ///
    /// # Errors
    ///
    /// The first failure raised by the catch-up drains.
    pub fn resume(&self) -> Result<()> {
        if self.inner.gate.is_paused() {
            debug!("[{}] resumed", self.inner.socket_type);
        }
        self.inner.gate.resume();
        self.drain_both()
    }

    /// Close the socket.
    ///
    /// Queued messages are abandoned and their callbacks never run. Closing
    /// twice is a no-op.
    pub fn close(&self) {
        if self.is_closed() {
            return;
        }
        self.inner.gate.close();
        self.inner.transport.borrow_mut().close();
        let abandoned = self.inner.outgoing.borrow_mut().clear();
        self.inner.assembler.borrow_mut().reset();

        // Drop queued edges.
        while self.inner.ready_rx.try_recv().is_ok() {}

        if abandoned > 0 {
            debug!(
                "[{}] closed, abandoned {} queued messages",
                self.inner.socket_type, abandoned
            );
        } else {
            debug!("[{}] closed", self.inner.socket_type);
        }
    }

    // ---------------------------------------------------------------------
    // Readiness
    // ---------------------------------------------------------------------

    /// Apply one readiness edge.
    ///
    /// # Errors
    ///
    /// Failures raised by the drains.
    pub fn on_ready(&self, readiness: Readiness) -> Result<()> {
        let result = self.apply_edge(readiness);
        self.rearm_reads();
        result
    }

    fn apply_edge(&self, readiness: Readiness) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.gate.record_edge();
        let read = if readiness.readable {
            self.drain_reads()
        } else {
            Ok(())
        };
        let write = if readiness.writable {
            self.drain_writes()
        } else {
            Ok(())
        };
        read.and(write)
    }

    /// Apply every queued readiness edge. Returns how many were applied.
    ///
    /// # Errors
    ///
    /// The first failure raised by a drain; later edges stay queued.
    pub fn process_ready(&self) -> Result<usize> {
        let mut applied = 0;
        let mut result = Ok(());
        while let Ok(readiness) = self.inner.ready_rx.try_recv() {
            applied += 1;
            result = self.apply_edge(readiness);
            if result.is_err() {
                break;
            }
        }
        self.rearm_reads();
        result.map(|()| applied)
    }

    /// Wait for the next readiness edge, then apply it and anything queued
    /// behind it.
    ///
    /// # Errors
    ///
    /// [`Error::SocketClosed`] if the socket is or becomes closed, otherwise
    /// failures raised by the drains.
    pub async fn ready(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SocketClosed);
        }
        let readiness = self
            .inner
            .ready_rx
            .recv_async()
            .await
            .map_err(|_| Error::SocketClosed)?;
        self.on_ready(readiness)?;
        self.process_ready().map(|_| ())
    }

    /// A second receiver for readiness edges, for adapters that poll.
    ///
    /// Edges taken through it are not applied by the socket; the holder is
    /// responsible for calling [`on_ready`](Self::on_ready) or reading.
    #[must_use]
    pub fn readiness_receiver(&self) -> flume::Receiver<Readiness> {
        self.inner.ready_rx.clone()
    }

    /// Level-triggered readiness of the transport.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        if self.is_closed() {
            return Readiness::NONE;
        }
        self.inner.transport.borrow().readiness()
    }

    // ---------------------------------------------------------------------
    // Endpoints
    // ---------------------------------------------------------------------

    /// Bind, catch up both directions, then emit `bind`.
    ///
    /// # Errors
    ///
    /// Transport bind failure, or failures raised by the catch-up drains.
    pub fn bind(&self, endpoint: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner.transport.borrow_mut().bind(endpoint)?;
        debug!("[{}] bound to {}", self.inner.socket_type, endpoint);
        self.drain_both()?;
        self.inner.listeners.emit(self, &SocketEvent::Bind(endpoint));
        Ok(())
    }

    /// Unbind, catch up both directions, then emit `unbind`.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn unbind(&self, endpoint: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner.transport.borrow_mut().unbind(endpoint)?;
        debug!("[{}] unbound from {}", self.inner.socket_type, endpoint);
        self.drain_both()?;
        self.inner.listeners.emit(self, &SocketEvent::Unbind(endpoint));
        Ok(())
    }

    /// Connect to a remote endpoint.
    ///
    /// # Errors
    ///
    /// Closed socket or transport connect failure.
    pub fn connect(&self, endpoint: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner.transport.borrow_mut().connect(endpoint)?;
        debug!("[{}] connected to {}", self.inner.socket_type, endpoint);
        Ok(())
    }

    /// Drop a connection.
    ///
    /// # Errors
    ///
    /// Closed socket or transport failure.
    pub fn disconnect(&self, endpoint: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner.transport.borrow_mut().disconnect(endpoint)?;
        debug!("[{}] disconnected from {}", self.inner.socket_type, endpoint);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Options
    // ---------------------------------------------------------------------

    /// Set an option.
    ///
    /// # Errors
    ///
    /// Closed socket, read-only option, wrong value shape, or a transport
    /// rejection.
    pub fn set_option(&self, option: SocketOption, value: impl Into<OptionValue>) -> Result<()> {
        self.ensure_open()?;
        let value = option.coerce(value.into())?;

        if option == SocketOption::MaxMsgSize {
            let limit = value.as_int().and_then(|v| usize::try_from(v).ok());
            self.inner.assembler.borrow_mut().set_max_bytes(limit);
        }

        self.inner.transport.borrow_mut().set_option(option, value)
    }

    /// [`set_option`](Self::set_option) by name (`"ZMQ_SNDHWM"` or `"sndhwm"`).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOption`], then as `set_option`.
    pub fn set_option_by_name(&self, name: &str, value: impl Into<OptionValue>) -> Result<()> {
        self.set_option(name.parse()?, value)
    }

    /// Read an option.
    ///
    /// # Errors
    ///
    /// Closed socket, write-only option, or a transport rejection.
    pub fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        self.ensure_open()?;
        match option {
            SocketOption::Type => Ok(OptionValue::Int(i64::from(self.inner.socket_type as u8))),
            SocketOption::RcvMore => {
                Ok(OptionValue::Bool(self.inner.assembler.borrow().is_partial()))
            }
            SocketOption::Events => {
                let ready = self.readiness();
                let mut bits = 0;
                if ready.readable {
                    bits |= POLLIN;
                }
                if ready.writable {
                    bits |= POLLOUT;
                }
                Ok(OptionValue::Int(bits))
            }
            SocketOption::Subscribe | SocketOption::Unsubscribe => {
                Err(Error::InvalidOptionValue {
                    option: option.name(),
                    reason: "option is write-only".into(),
                })
            }
            _ => self.inner.transport.borrow().get_option(option),
        }
    }

    /// [`get_option`](Self::get_option) by name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOption`], then as `get_option`.
    pub fn get_option_by_name(&self, name: &str) -> Result<OptionValue> {
        self.get_option(name.parse()?)
    }

    /// Add a subscription prefix. An empty prefix matches everything.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the socket is SUB or XSUB.
    pub fn subscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.ensure_subscriber("subscribe")?;
        self.set_option(SocketOption::Subscribe, OptionValue::Bytes(prefix.into()))
    }

    /// Remove a subscription prefix.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the socket is SUB or XSUB.
    pub fn unsubscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.ensure_subscriber("unsubscribe")?;
        self.set_option(SocketOption::Unsubscribe, OptionValue::Bytes(prefix.into()))
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Register a handler for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Self, &SocketEvent<'_>) + 'static,
    {
        self.inner.listeners.add(kind, Rc::new(handler))
    }

    /// Register a handler by event name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEvent`].
    pub fn on_named<F>(&self, name: &str, handler: F) -> Result<ListenerId>
    where
        F: Fn(&Self, &SocketEvent<'_>) + 'static,
    {
        Ok(self.on(name.parse()?, handler))
    }

    /// Register a `message` handler.
    pub fn on_message<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Self, &Message) + 'static,
    {
        self.on(EventKind::Message, move |socket, event| {
            if let SocketEvent::Message(msg) = event {
                handler(socket, msg);
            }
        })
    }

    /// Register an `error` handler.
    pub fn on_error<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Self, &Error) + 'static,
    {
        self.on(EventKind::Error, move |socket, event| {
            if let SocketEvent::Error(err) = event {
                handler(socket, err);
            }
        })
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Remove every handler of `kind`.
    pub fn off_all(&self, kind: EventKind) {
        self.inner.listeners.remove_all(kind);
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.listeners.count(kind)
    }

    /// Emit `err` as an `error` event, or hand it back when nobody listens.
    fn raise(&self, err: Error) -> Result<()> {
        if self.inner.listeners.count(EventKind::Error) == 0 {
            warn!(
                "[{}] unhandled error raised to caller: {}",
                self.inner.socket_type, err
            );
            return Err(err);
        }
        self.inner.listeners.emit(self, &SocketEvent::Error(&err));
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::SocketClosed)
        } else {
            Ok(())
        }
    }

    fn ensure_subscriber(&self, op: &'static str) -> Result<()> {
        match self.inner.socket_type {
            SocketType::Sub | SocketType::XSub => Ok(()),
            socket_type => Err(Error::Unsupported { op, socket_type }),
        }
    }
}

impl<T: Transport> fmt::Debug for Socket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("type", &self.inner.socket_type)
            .field("paused", &self.is_paused())
            .field("closed", &self.is_closed())
            .field("queued_batches", &self.inner.outgoing.borrow().len())
            .finish_non_exhaustive()
    }
}
