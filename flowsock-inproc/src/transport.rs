//! In-process transport handle.
//!
//! Frames are collected until the final frame of a message and then handed
//! to the peer mailbox as one unit, so a receiver never sees a partial
//! message. Admission (peer selection, high water mark, ROUTER lookup) is
//! decided at the first frame: that is where `WouldBlock` and routing errors
//! are reported, before any frame of the message was accepted.
//!
//! ## Patterns
//!
//! | Pattern            | Outbound                               | Blocks when            |
//! |--------------------|----------------------------------------|------------------------|
//! | PUSH, DEALER       | round-robin over peers with room       | no peer has room       |
//! | PAIR               | the single peer                        | no peer / peer full    |
//! | REQ                | round-robin, then wait for the reply   | no peer has room       |
//! | REP                | back to the requester                  | never                  |
//! | PUB, XPUB          | every peer whose subscriptions match   | never (drops at HWM)   |
//! | ROUTER             | peer named by the first frame          | peer full (mandatory)  |
//! | XSUB               | subscription requests upstream         | never                  |

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use flowsock_core::error::{Error, Result};
use flowsock_core::frame::{Frame, SendFlags};
use flowsock_core::gate::Readiness;
use flowsock_core::options::{OptionKind, OptionValue, SocketOption, SocketOptions};
use flowsock_core::socket_type::SocketType;
use flowsock_core::transport::{ReadyNotifier, SendStatus, Transport};
use tracing::{debug, trace};

use crate::context::Context;
use crate::endpoint::InprocEndpoint;
use crate::mailbox::{Envelope, Mailbox};
use crate::subscription::SubscriptionRequest;

/// Where the message being sent goes once its final frame arrives.
#[derive(Debug)]
enum Route {
    /// One selected peer.
    Peer(Weak<Mailbox>),
    /// Every subscribed peer.
    Fanout,
    /// REP answer to the pending request.
    Reply,
    /// XSUB subscription traffic.
    Upstream,
    /// Accepted and discarded (unroutable, non-mandatory ROUTER).
    Discard,
}

/// Request/reply envelope state.
#[derive(Debug, Default)]
enum Exchange {
    #[default]
    None,
    /// REQ sent a request and waits for its reply.
    AwaitingReply,
    /// REP holds a request; the next send answers it.
    Replying {
        to: Weak<Mailbox>,
        envelope: Vec<Bytes>,
    },
}

/// A socket handle on an in-process [`Context`].
pub struct InprocTransport {
    ctx: Context,
    mailbox: Arc<Mailbox>,
    options: SocketOptions,
    bound: Vec<InprocEndpoint>,
    connected: Vec<(InprocEndpoint, Weak<Mailbox>)>,
    last_endpoint: Option<String>,

    outgoing: Vec<Bytes>,
    route: Option<Route>,
    next_peer: usize,
    exchange: Exchange,

    reading: VecDeque<Bytes>,
    more: bool,
    closed: bool,
}

impl InprocTransport {
    pub(crate) fn new(ctx: Context, mailbox: Arc<Mailbox>) -> Self {
        Self {
            ctx,
            mailbox,
            options: SocketOptions::new(),
            bound: Vec::new(),
            connected: Vec::new(),
            last_endpoint: None,
            outgoing: Vec::new(),
            route: None,
            next_peer: 0,
            exchange: Exchange::None,
            reading: VecDeque::new(),
            more: false,
            closed: false,
        }
    }

    /// Context this handle was created from.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Number of live peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.mailbox.peer_count()
    }

    /// Complete messages waiting to be read.
    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.mailbox.inbox_len()
    }

    fn socket_type(&self) -> SocketType {
        self.mailbox.socket_type()
    }

    // -- sending ----------------------------------------------------------

    /// Pick a peer with room, round-robin. Registers as a blocked sender on
    /// every full peer when none has room.
    fn select_peer(&mut self) -> Option<Arc<Mailbox>> {
        let peers = self.mailbox.peers();
        if peers.is_empty() {
            return None;
        }
        let start = self.next_peer % peers.len();
        let send_hwm = self.mailbox.send_hwm();
        for offset in 0..peers.len() {
            let i = (start + offset) % peers.len();
            if peers[i].has_room(send_hwm) {
                self.next_peer = i + 1;
                return Some(Arc::clone(&peers[i]));
            }
        }
        for peer in &peers {
            peer.reserve_or_wait(&self.mailbox);
        }
        None
    }

    /// Decide the route for a message whose first frame is `first`.
    fn admit(&mut self, first: &Bytes) -> Result<Option<Route>> {
        let socket_type = self.socket_type();
        let route = match socket_type {
            SocketType::Push | SocketType::Dealer => match self.select_peer() {
                Some(peer) => Route::Peer(Arc::downgrade(&peer)),
                None => return Ok(None),
            },
            SocketType::Pair => {
                let Some(peer) = self.mailbox.peers().into_iter().next() else {
                    return Ok(None);
                };
                if !peer.reserve_or_wait(&self.mailbox) {
                    return Ok(None);
                }
                Route::Peer(Arc::downgrade(&peer))
            }
            SocketType::Req => {
                if matches!(self.exchange, Exchange::AwaitingReply) {
                    return Err(Error::invalid_state(
                        "REQ cannot send another request before the reply arrives",
                    ));
                }
                match self.select_peer() {
                    Some(peer) => Route::Peer(Arc::downgrade(&peer)),
                    None => return Ok(None),
                }
            }
            SocketType::Rep => {
                if !matches!(self.exchange, Exchange::Replying { .. }) {
                    return Err(Error::invalid_state("REP cannot send before receiving a request"));
                }
                Route::Reply
            }
            SocketType::Router => match self.route_by_identity(first)? {
                Some(route) => route,
                None => return Ok(None),
            },
            SocketType::Pub | SocketType::XPub => Route::Fanout,
            SocketType::XSub => Route::Upstream,
            SocketType::Sub | SocketType::Pull | SocketType::Stream => {
                return Err(Error::Unsupported {
                    op: "send",
                    socket_type,
                })
            }
        };
        Ok(Some(route))
    }

    /// ROUTER: the first frame names the peer. `None` means the peer is full
    /// and the message has to wait.
    fn route_by_identity(&mut self, identity: &Bytes) -> Result<Option<Route>> {
        let mandatory = self.options.router_mandatory();
        let peer = self
            .mailbox
            .peers()
            .into_iter()
            .find(|p| p.identity() == *identity);

        match peer {
            Some(peer) if peer.reserve_or_wait(&self.mailbox) => {
                Ok(Some(Route::Peer(Arc::downgrade(&peer))))
            }
            Some(_) if mandatory => Ok(None),
            Some(_) => {
                trace!("[ROUTER] peer full, dropping message");
                Ok(Some(Route::Discard))
            }
            None if mandatory => {
                debug!("[ROUTER] no route to {:?}", identity);
                Err(Error::Unroutable {
                    identity: identity.clone(),
                })
            }
            None => {
                trace!("[ROUTER] unknown identity, dropping message");
                Ok(Some(Route::Discard))
            }
        }
    }

    /// Hand the collected message to its destination.
    fn dispatch(&mut self, route: Route, frames: Vec<Bytes>) {
        match route {
            Route::Peer(peer) => match peer.upgrade() {
                Some(peer) if peer.deliver(&self.mailbox, frames) => {
                    if self.socket_type() == SocketType::Req {
                        self.exchange = Exchange::AwaitingReply;
                    }
                }
                _ => debug!("[{}] peer went away, message dropped", self.socket_type()),
            },
            Route::Fanout => self.fan_out(frames),
            Route::Reply => {
                if let Exchange::Replying { to, mut envelope } = std::mem::take(&mut self.exchange)
                {
                    envelope.extend(frames);
                    if let Some(peer) = to.upgrade() {
                        peer.deliver(&self.mailbox, envelope);
                    }
                }
                // Requests that queued up while replying are readable now.
                if self.mailbox.inbox_len() > 0 {
                    self.mailbox.notify(Readiness::READABLE);
                }
            }
            Route::Upstream => self.send_upstream(frames),
            Route::Discard => {}
        }
    }

    fn fan_out(&self, frames: Vec<Bytes>) {
        let topic = frames.first().cloned().unwrap_or_default();
        let send_hwm = self.mailbox.send_hwm();
        let mut delivered = 0usize;
        for peer in self.mailbox.peers() {
            if peer.subscribed_to(&topic) && peer.has_room(send_hwm) {
                peer.deliver(&self.mailbox, frames.clone());
                delivered += 1;
            }
        }
        trace!("[{}] fanned out to {} peers", self.socket_type(), delivered);
    }

    /// XSUB: a subscription request updates the local filter and travels to
    /// every publisher. Anything else is forwarded upstream as-is.
    fn send_upstream(&self, frames: Vec<Bytes>) {
        if let Some(request) = frames.first().and_then(SubscriptionRequest::from_frame) {
            self.mailbox.apply_subscription(&request);
        }
        for peer in self.mailbox.peers() {
            if peer.socket_type() == SocketType::XPub {
                peer.deliver(&self.mailbox, frames.clone());
            }
        }
    }

    /// Tell XPUB peers about a subscription change on this SUB/XSUB.
    fn announce(&self, request: &SubscriptionRequest) {
        let frame = request.to_frame();
        for peer in self.mailbox.peers() {
            if peer.socket_type() == SocketType::XPub {
                peer.deliver(&self.mailbox, vec![frame.clone()]);
            }
        }
    }

    fn abort_message(&mut self) {
        self.outgoing.clear();
        self.route = None;
        // A failed message ends the drain; the next interest is a fresh edge.
        self.mailbox.set_write_interest(false);
    }

    /// Record one accepted frame and dispatch the message on its last frame.
    fn finish_frame(&mut self, flags: SendFlags, frame: Option<Bytes>) -> Result<SendStatus> {
        if let Some(frame) = frame {
            self.outgoing.push(frame);
        }
        if !flags.more() {
            let frames = std::mem::take(&mut self.outgoing);
            if let Some(route) = self.route.take() {
                self.dispatch(route, frames);
            }
        }
        Ok(SendStatus::Sent)
    }

    // -- receiving --------------------------------------------------------

    /// Filter an inbound message through the pattern's envelope rules.
    fn accept(&mut self, envelope: Envelope) -> Option<Vec<Bytes>> {
        let Envelope { from, mut frames } = envelope;
        match self.socket_type() {
            SocketType::Req => {
                if !matches!(self.exchange, Exchange::AwaitingReply) {
                    trace!("[REQ] unexpected reply dropped");
                    return None;
                }
                if frames.first().map_or(true, |f| !f.is_empty()) {
                    trace!("[REQ] reply without delimiter dropped");
                    return None;
                }
                frames.remove(0);
                self.exchange = Exchange::None;
                self.mailbox.wake_writer();
                Some(frames)
            }
            SocketType::Rep => {
                let Some(split) = frames.iter().position(Bytes::is_empty) else {
                    trace!("[REP] request without delimiter dropped");
                    return None;
                };
                let body = frames.split_off(split + 1);
                self.exchange = Exchange::Replying {
                    to: from,
                    envelope: frames,
                };
                self.mailbox.wake_writer();
                Some(body)
            }
            SocketType::Sub => {
                // Subscriptions may have changed since the message was queued.
                let topic = frames.first().cloned().unwrap_or_default();
                self.mailbox.subscribed_to(&topic).then_some(frames)
            }
            _ => Some(frames),
        }
    }

    fn is_replying(&self) -> bool {
        matches!(self.exchange, Exchange::Replying { .. })
    }

    // -- endpoints --------------------------------------------------------

    fn link(&mut self, peer: &Arc<Mailbox>) {
        self.mailbox.add_peer(peer);
        peer.add_peer(&self.mailbox);

        // Late subscribers: replay current subscriptions to a new XPUB peer.
        if peer.socket_type() == SocketType::XPub {
            for frame in self.mailbox.subscription_frames() {
                peer.deliver(&self.mailbox, vec![frame]);
            }
        }
        if self.socket_type() == SocketType::XPub {
            for frame in peer.subscription_frames() {
                self.mailbox.deliver(peer, vec![frame]);
            }
        }

        self.mailbox.wake_writer();
        peer.wake_writer();
    }

    fn apply_option(&mut self, option: SocketOption, value: &OptionValue) -> Result<()> {
        match option {
            SocketOption::SndHwm => {
                self.mailbox.set_send_hwm(self.options.send_hwm());
            }
            SocketOption::RcvHwm => {
                self.mailbox.set_recv_hwm(self.options.recv_hwm());
            }
            SocketOption::RoutingId => {
                if let Some(id) = value.as_bytes() {
                    self.mailbox.set_identity(id.clone());
                }
            }
            SocketOption::Subscribe | SocketOption::Unsubscribe => {
                let socket_type = self.socket_type();
                if !matches!(socket_type, SocketType::Sub | SocketType::XSub) {
                    return Err(Error::Unsupported {
                        op: option.name(),
                        socket_type,
                    });
                }
                let prefix = value.as_bytes().cloned().unwrap_or_default();
                let request = if option == SocketOption::Subscribe {
                    SubscriptionRequest::Subscribe(prefix)
                } else {
                    SubscriptionRequest::Unsubscribe(prefix)
                };
                if self.mailbox.apply_subscription(&request) {
                    self.announce(&request);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Transport for InprocTransport {
    fn socket_type(&self) -> SocketType {
        self.mailbox.socket_type()
    }

    fn set_notifier(&mut self, notifier: ReadyNotifier) {
        self.mailbox.set_notifier(notifier);
    }

    fn readiness(&self) -> Readiness {
        if self.closed {
            return Readiness::NONE;
        }
        let socket_type = self.socket_type();
        let send_hwm = self.mailbox.send_hwm();
        let any_room = || self.mailbox.peers().iter().any(|p| p.has_room(send_hwm));

        let readable = socket_type.can_recv()
            && (!self.reading.is_empty() || (!self.is_replying() && self.mailbox.inbox_len() > 0));
        let writable = match socket_type {
            SocketType::Pub | SocketType::XPub | SocketType::XSub | SocketType::Router => true,
            SocketType::Push | SocketType::Dealer => any_room(),
            SocketType::Pair => self
                .mailbox
                .peers()
                .first()
                .is_some_and(|p| p.has_room(send_hwm)),
            SocketType::Req => !matches!(self.exchange, Exchange::AwaitingReply) && any_room(),
            SocketType::Rep => self.is_replying(),
            SocketType::Sub | SocketType::Pull | SocketType::Stream => false,
        };
        Readiness { readable, writable }
    }

    fn set_write_interest(&mut self, pending: bool) {
        let was = self.mailbox.set_write_interest(pending);
        if pending && !was && self.readiness().writable {
            self.mailbox.wake_writer();
        }
    }

    fn send_frame(&mut self, frame: &Frame, flags: SendFlags) -> Result<SendStatus> {
        if self.closed {
            return Err(Error::SocketClosed);
        }

        if self.route.is_none() {
            match self.admit(frame.bytes()) {
                Ok(Some(route)) => {
                    if self.socket_type() == SocketType::Req {
                        self.outgoing.push(Bytes::new());
                    }
                    self.route = Some(route);
                    // ROUTER consumes the identity frame.
                    if self.socket_type() == SocketType::Router {
                        return self.finish_frame(flags, None);
                    }
                }
                Ok(None) => return Ok(SendStatus::WouldBlock),
                Err(e) => {
                    self.abort_message();
                    return Err(e);
                }
            }
        }

        self.finish_frame(flags, Some(frame.bytes().clone()))
    }

    fn recv_frame(&mut self) -> Result<Option<Bytes>> {
        if self.closed {
            return Ok(None);
        }

        while self.reading.is_empty() {
            if self.is_replying() {
                return Ok(None);
            }
            let Some(envelope) = self.mailbox.pop() else {
                return Ok(None);
            };
            if let Some(frames) = self.accept(envelope) {
                self.reading = frames.into();
            }
        }

        let frame = self.reading.pop_front();
        self.more = !self.reading.is_empty();
        Ok(frame)
    }

    fn has_more(&self) -> bool {
        self.more
    }

    fn bind(&mut self, endpoint: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SocketClosed);
        }
        let ep = InprocEndpoint::parse(endpoint)?;
        self.ctx.register(ep.name(), &self.mailbox)?;
        debug!("[{}] bound {}", self.socket_type(), ep);
        self.last_endpoint = Some(ep.to_string());
        self.bound.push(ep);
        Ok(())
    }

    fn unbind(&mut self, endpoint: &str) -> Result<()> {
        let ep = InprocEndpoint::parse(endpoint)?;
        let Some(pos) = self.bound.iter().position(|b| *b == ep) else {
            return Err(Error::EndpointNotFound(endpoint.to_string()));
        };
        self.bound.remove(pos);
        self.ctx.unregister(ep.name(), self.mailbox.id());
        Ok(())
    }

    fn connect(&mut self, endpoint: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SocketClosed);
        }
        let ep = InprocEndpoint::parse(endpoint)?;
        let peer = self
            .ctx
            .lookup(ep.name())
            .ok_or_else(|| Error::EndpointNotFound(ep.to_string()))?;

        let (ours, theirs) = (self.socket_type(), peer.socket_type());
        if !ours.is_compatible(theirs) {
            return Err(Error::transport(format!(
                "{ours} socket cannot connect to a {theirs} socket"
            )));
        }

        self.link(&peer);
        debug!("[{}] connected to {} ({})", ours, ep, theirs);
        self.last_endpoint = Some(ep.to_string());
        self.connected.push((ep, Arc::downgrade(&peer)));
        Ok(())
    }

    fn disconnect(&mut self, endpoint: &str) -> Result<()> {
        let ep = InprocEndpoint::parse(endpoint)?;
        let Some(pos) = self.connected.iter().position(|(e, _)| *e == ep) else {
            return Err(Error::EndpointNotFound(endpoint.to_string()));
        };
        let (_, peer) = self.connected.remove(pos);
        if let Some(peer) = peer.upgrade() {
            peer.remove_peer(self.mailbox.id());
            self.mailbox.remove_peer(peer.id());
        }
        Ok(())
    }

    fn set_option(&mut self, option: SocketOption, value: OptionValue) -> Result<()> {
        self.options.set(option, value.clone())?;
        self.apply_option(option, &value)
    }

    fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        let value = match option {
            SocketOption::SndHwm => OptionValue::from(self.options.send_hwm()),
            SocketOption::RcvHwm => OptionValue::from(self.options.recv_hwm()),
            SocketOption::Linger => OptionValue::Int(self.options.linger()),
            SocketOption::MaxMsgSize => OptionValue::Int(
                self.options
                    .max_msg_size()
                    .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX)),
            ),
            SocketOption::RoutingId => OptionValue::Bytes(self.mailbox.identity()),
            SocketOption::Type => OptionValue::Int(i64::from(self.socket_type() as u8)),
            SocketOption::RcvMore => OptionValue::Bool(self.more),
            SocketOption::LastEndpoint => OptionValue::Bytes(
                self.last_endpoint
                    .clone()
                    .map(Bytes::from)
                    .unwrap_or_default(),
            ),
            SocketOption::Events => {
                let ready = self.readiness();
                OptionValue::Int(i64::from(ready.readable) | (i64::from(ready.writable) << 1))
            }
            SocketOption::Subscribe | SocketOption::Unsubscribe => {
                return Err(Error::InvalidOptionValue {
                    option: option.name(),
                    reason: "option is write-only".into(),
                })
            }
            other => match self.options.get(other) {
                Some(v) => v.clone(),
                None => match other.kind() {
                    OptionKind::Int => OptionValue::Int(0),
                    OptionKind::Bool => OptionValue::Bool(false),
                    OptionKind::Bytes => OptionValue::Bytes(Bytes::new()),
                },
            },
        };
        Ok(value)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for ep in self.bound.drain(..) {
            self.ctx.unregister(ep.name(), self.mailbox.id());
        }
        self.connected.clear();
        self.outgoing.clear();
        self.reading.clear();
        self.route = None;
        self.mailbox.close();
        self.ctx.release_socket();
        debug!("[{}] inproc handle closed", self.socket_type());
    }
}

impl Drop for InprocTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InprocTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InprocTransport")
            .field("type", &self.socket_type())
            .field("bound", &self.bound)
            .field("peers", &self.mailbox.peer_count())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
