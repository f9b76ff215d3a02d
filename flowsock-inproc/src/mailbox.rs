//! Per-socket shared state.
//!
//! Every inproc socket owns one [`Mailbox`], reachable from its peers through
//! weak links. A mailbox holds complete inbound messages, the socket's
//! identity and subscriptions, and the notifier used to raise readiness
//! edges.
//!
//! Locking rule: never hold two mailbox locks at once. Anything that has to
//! touch a peer collects what it needs, releases its own lock, then locks the
//! peer. Notifications are sent with no lock held.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use flowsock_core::gate::Readiness;
use flowsock_core::options::DEFAULT_HWM;
use flowsock_core::socket_type::SocketType;
use flowsock_core::transport::ReadyNotifier;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use crate::subscription::{SubscriptionRequest, SubscriptionSet};

/// A complete message waiting in an inbox.
#[derive(Debug)]
pub(crate) struct Envelope {
    /// Sending mailbox, for replies.
    pub from: Weak<Mailbox>,
    pub frames: Vec<Bytes>,
}

#[derive(Debug)]
struct State {
    identity: Bytes,
    inbox: VecDeque<Envelope>,
    send_hwm: usize,
    recv_hwm: usize,
    subscriptions: SubscriptionSet,
    notifier: Option<ReadyNotifier>,
    write_interest: bool,
    peers: Vec<Weak<Mailbox>>,
    blocked_senders: Vec<Weak<Mailbox>>,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Mailbox {
    id: u64,
    socket_type: SocketType,
    state: Mutex<State>,
}

impl Mailbox {
    pub fn new(id: u64, socket_type: SocketType) -> Arc<Self> {
        // Auto identity: a zero byte followed by the socket id.
        let mut identity = Vec::with_capacity(9);
        identity.push(0);
        identity.extend_from_slice(&id.to_be_bytes());

        Arc::new(Self {
            id,
            socket_type,
            state: Mutex::new(State {
                identity: Bytes::from(identity),
                inbox: VecDeque::new(),
                send_hwm: DEFAULT_HWM,
                recv_hwm: DEFAULT_HWM,
                subscriptions: SubscriptionSet::new(),
                notifier: None,
                write_interest: false,
                peers: Vec::new(),
                blocked_senders: Vec::new(),
                closed: false,
            }),
        })
    }

    #[inline]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub const fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn set_notifier(&self, notifier: ReadyNotifier) {
        self.state.lock().notifier = Some(notifier);
    }

    pub fn identity(&self) -> Bytes {
        self.state.lock().identity.clone()
    }

    pub fn set_identity(&self, identity: Bytes) {
        self.state.lock().identity = identity;
    }

    pub fn send_hwm(&self) -> usize {
        self.state.lock().send_hwm
    }

    pub fn set_send_hwm(&self, hwm: usize) {
        self.state.lock().send_hwm = hwm;
    }

    pub fn recv_hwm(&self) -> usize {
        self.state.lock().recv_hwm
    }

    pub fn set_recv_hwm(&self, hwm: usize) {
        self.state.lock().recv_hwm = hwm;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    // -- peers ------------------------------------------------------------

    pub fn add_peer(&self, peer: &Arc<Self>) {
        self.state.lock().peers.push(Arc::downgrade(peer));
    }

    pub fn remove_peer(&self, peer_id: u64) {
        self.state
            .lock()
            .peers
            .retain(|p| p.upgrade().is_some_and(|p| p.id != peer_id));
    }

    /// Live peers, in connection order. Dead links are pruned.
    pub fn peers(&self) -> Vec<Arc<Self>> {
        let mut state = self.state.lock();
        state.peers.retain(|p| p.strong_count() > 0);
        state.peers.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers().len()
    }

    // -- inbox ------------------------------------------------------------

    /// Whether a sender with `send_hwm` may add one more message.
    ///
    /// The limit is the sum of both high water marks; 0 on either side means
    /// unlimited.
    pub fn has_room(&self, send_hwm: usize) -> bool {
        let state = self.state.lock();
        if state.closed {
            return false;
        }
        if send_hwm == 0 || state.recv_hwm == 0 {
            return true;
        }
        state.inbox.len() < send_hwm + state.recv_hwm
    }

    /// Like [`has_room`](Self::has_room), but remembers `sender` so it is
    /// woken once a message leaves this inbox.
    pub fn reserve_or_wait(&self, sender: &Arc<Self>) -> bool {
        let send_hwm = sender.send_hwm();
        if self.has_room(send_hwm) {
            return true;
        }
        let mut state = self.state.lock();
        if !state.blocked_senders.iter().any(|w| w.as_ptr() == Arc::as_ptr(sender)) {
            state.blocked_senders.push(Arc::downgrade(sender));
        }
        false
    }

    /// Whether a published topic matches this mailbox's subscriptions.
    pub fn subscribed_to(&self, topic: &[u8]) -> bool {
        self.state.lock().subscriptions.matches(topic)
    }

    /// Apply a subscription request. Returns whether the set changed.
    pub fn apply_subscription(&self, request: &SubscriptionRequest) -> bool {
        request.apply(&mut self.state.lock().subscriptions)
    }

    /// Current subscriptions as upstream request frames.
    pub fn subscription_frames(&self) -> SmallVec<[Bytes; 4]> {
        self.state
            .lock()
            .subscriptions
            .prefixes()
            .map(|p| SubscriptionRequest::Subscribe(p.clone()).to_frame())
            .collect()
    }

    /// Queue a message. Raises a readable edge when the inbox was empty.
    ///
    /// Returns `false` if the mailbox is closed and the message was dropped.
    pub fn deliver(&self, from: &Arc<Self>, mut frames: Vec<Bytes>) -> bool {
        if self.socket_type == SocketType::Router {
            frames.insert(0, from.identity());
        }

        let notifier = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            let was_empty = state.inbox.is_empty();
            state.inbox.push_back(Envelope {
                from: Arc::downgrade(from),
                frames,
            });
            if was_empty {
                state.notifier.clone()
            } else {
                None
            }
        };

        if let Some(n) = notifier {
            n.notify(Readiness::READABLE);
        }
        true
    }

    /// Take the oldest message and wake senders that were waiting for room.
    pub fn pop(&self) -> Option<Envelope> {
        let (envelope, blocked) = {
            let mut state = self.state.lock();
            let envelope = state.inbox.pop_front()?;
            (envelope, std::mem::take(&mut state.blocked_senders))
        };

        for sender in blocked.iter().filter_map(Weak::upgrade) {
            sender.wake_writer();
        }
        Some(envelope)
    }

    pub fn inbox_len(&self) -> usize {
        self.state.lock().inbox.len()
    }

    // -- readiness --------------------------------------------------------

    /// Record write interest. Returns the previous value.
    pub fn set_write_interest(&self, pending: bool) -> bool {
        std::mem::replace(&mut self.state.lock().write_interest, pending)
    }

    /// Raise a writable edge if the socket has messages waiting to go out.
    pub fn wake_writer(&self) {
        let notifier = {
            let state = self.state.lock();
            if state.closed || !state.write_interest {
                return;
            }
            state.notifier.clone()
        };
        if let Some(n) = notifier {
            trace!("[{}] writable edge", self.socket_type);
            n.notify(Readiness::WRITABLE);
        }
    }

    /// Raise an edge unconditionally.
    pub fn notify(&self, readiness: Readiness) {
        let notifier = self.state.lock().notifier.clone();
        if let Some(n) = notifier {
            n.notify(readiness);
        }
    }

    /// Mark closed, drop queued messages and unlink every peer.
    pub fn close(self: &Arc<Self>) {
        let (peers, blocked) = {
            let mut state = self.state.lock();
            state.closed = true;
            state.inbox.clear();
            state.notifier = None;
            state.write_interest = false;
            (
                std::mem::take(&mut state.peers),
                std::mem::take(&mut state.blocked_senders),
            )
        };

        for peer in peers.iter().filter_map(Weak::upgrade) {
            peer.remove_peer(self.id);
        }
        // Senders blocked on a closed inbox can route elsewhere now.
        for sender in blocked.iter().filter_map(Weak::upgrade) {
            sender.wake_writer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_inbox_prepends_identity() {
        let router = Mailbox::new(1, SocketType::Router);
        let dealer = Mailbox::new(2, SocketType::Dealer);
        dealer.set_identity(Bytes::from_static(b"worker"));

        assert!(router.deliver(&dealer, vec![Bytes::from_static(b"hi")]));
        let env = router.pop().unwrap();
        assert_eq!(env.frames, vec![Bytes::from_static(b"worker"), Bytes::from_static(b"hi")]);
        assert_eq!(env.from.upgrade().unwrap().id(), 2);
    }

    #[test]
    fn test_room_is_sum_of_hwms() {
        let pull = Mailbox::new(1, SocketType::Pull);
        let push = Mailbox::new(2, SocketType::Push);
        pull.set_recv_hwm(1);
        push.set_send_hwm(1);

        assert!(pull.reserve_or_wait(&push));
        pull.deliver(&push, vec![Bytes::from_static(b"1")]);
        pull.deliver(&push, vec![Bytes::from_static(b"2")]);
        assert!(!pull.reserve_or_wait(&push));

        pull.set_recv_hwm(0);
        assert!(pull.has_room(1));
    }

    #[test]
    fn test_pop_wakes_blocked_sender() {
        let pull = Mailbox::new(1, SocketType::Pull);
        let push = Mailbox::new(2, SocketType::Push);
        let (tx, rx) = flume::unbounded();
        push.set_notifier(ReadyNotifier::new(tx));
        push.set_write_interest(true);
        pull.set_recv_hwm(1);
        push.set_send_hwm(1);

        pull.deliver(&push, vec![Bytes::from_static(b"1")]);
        pull.deliver(&push, vec![Bytes::from_static(b"2")]);
        assert!(!pull.reserve_or_wait(&push));
        assert!(rx.try_recv().is_err());

        pull.pop().unwrap();
        assert_eq!(rx.try_recv().unwrap(), Readiness::WRITABLE);
    }

    #[test]
    fn test_readable_edge_only_when_inbox_was_empty() {
        let pull = Mailbox::new(1, SocketType::Pull);
        let push = Mailbox::new(2, SocketType::Push);
        let (tx, rx) = flume::unbounded();
        pull.set_notifier(ReadyNotifier::new(tx));

        pull.deliver(&push, vec![Bytes::from_static(b"1")]);
        pull.deliver(&push, vec![Bytes::from_static(b"2")]);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_close_unlinks_peers() {
        let a = Mailbox::new(1, SocketType::Pair);
        let b = Mailbox::new(2, SocketType::Pair);
        a.add_peer(&b);
        b.add_peer(&a);

        a.close();
        assert_eq!(b.peer_count(), 0);
        assert!(!a.deliver(&b, vec![Bytes::new()]));
    }
}
