//! Event listeners.
//!
//! Handlers are registered per event kind, any number per kind, and are
//! called in registration order. Handlers are `Fn` and shared through `Rc`,
//! so a handler may freely call back into the socket (send, pause, register
//! more handlers) while an event is being delivered.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::Error;
use crate::message::Message;

/// Event kinds a socket emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A complete message was received.
    Message,
    /// A send or receive failure nobody else handled.
    Error,
    /// `bind` completed.
    Bind,
    /// `unbind` completed.
    Unbind,
}

impl EventKind {
    /// Lowercase event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Error => "error",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "error" => Ok(Self::Error),
            "bind" => Ok(Self::Bind),
            "unbind" => Ok(Self::Unbind),
            _ => Err(Error::UnknownEvent(s.to_string())),
        }
    }
}

/// An event as seen by handlers.
#[derive(Debug, Clone, Copy)]
pub enum SocketEvent<'a> {
    /// A complete message.
    Message(&'a Message),
    /// A failure surfaced as an event.
    Error(&'a Error),
    /// Bound endpoint.
    Bind(&'a str),
    /// Unbound endpoint.
    Unbind(&'a str),
}

impl SocketEvent<'_> {
    /// The kind this event is delivered under.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::Error(_) => EventKind::Error,
            Self::Bind(_) => EventKind::Bind,
            Self::Unbind(_) => EventKind::Unbind,
        }
    }
}

/// Handle returned by registration, used to remove the handler later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event handler receiving the emitting socket and the event.
pub type Handler<C> = Rc<dyn Fn(&C, &SocketEvent<'_>)>;

/// Registry of handlers for one socket.
pub struct Listeners<C> {
    handlers: RefCell<Vec<(ListenerId, EventKind, Handler<C>)>>,
    next_id: Cell<u64>,
}

impl<C> Listeners<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register `handler` for `kind`.
    pub fn add(&self, kind: EventKind, handler: Handler<C>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, kind, handler));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(hid, _, _)| *hid != id);
        handlers.len() != before
    }

    /// Remove every handler of `kind`.
    pub fn remove_all(&self, kind: EventKind) {
        self.handlers.borrow_mut().retain(|(_, k, _)| *k != kind);
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Deliver `event` to its handlers and return how many were called.
    ///
    /// The handler list is snapshotted first: handlers added during delivery
    /// see the next event, not this one.
    pub fn emit(&self, ctx: &C, event: &SocketEvent<'_>) -> usize {
        let kind = event.kind();
        let targets: Vec<Handler<C>> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();

        for handler in &targets {
            handler(ctx, event);
        }
        targets.len()
    }
}

impl<C> Default for Listeners<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Listeners<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("handlers", &self.handlers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_registration_order() {
        let listeners = Listeners::<()>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            listeners.add(
                EventKind::Message,
                Rc::new(move |_, _| log.borrow_mut().push(tag)),
            );
        }

        let msg = Message::from_frames(vec![Bytes::from_static(b"x")]);
        assert_eq!(listeners.emit(&(), &SocketEvent::Message(&msg)), 3);
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_kinds_are_separate() {
        let listeners = Listeners::<()>::new();
        listeners.add(EventKind::Bind, Rc::new(|_, _| {}));
        assert_eq!(listeners.count(EventKind::Bind), 1);
        assert_eq!(listeners.count(EventKind::Error), 0);
        assert_eq!(listeners.emit(&(), &SocketEvent::Error(&Error::SocketClosed)), 0);
    }

    #[test]
    fn test_remove() {
        let listeners = Listeners::<()>::new();
        let id = listeners.add(EventKind::Error, Rc::new(|_, _| {}));
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert_eq!(listeners.count(EventKind::Error), 0);
    }

    #[test]
    fn test_handler_may_register_during_emit() {
        let listeners = Rc::new(Listeners::<()>::new());
        let inner = Rc::clone(&listeners);
        listeners.add(
            EventKind::Bind,
            Rc::new(move |_, _| {
                inner.add(EventKind::Bind, Rc::new(|_, _| {}));
            }),
        );

        assert_eq!(listeners.emit(&(), &SocketEvent::Bind("inproc://a")), 1);
        assert_eq!(listeners.count(EventKind::Bind), 2);
    }

    #[test]
    fn test_event_names() {
        assert_eq!("message".parse::<EventKind>().unwrap(), EventKind::Message);
        assert!(matches!(
            "data".parse::<EventKind>(),
            Err(Error::UnknownEvent(_))
        ));
    }
}
