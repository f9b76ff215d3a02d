//! Atomic send units.
//!
//! A batch holds every frame of one multipart message together with the
//! completion callbacks registered while the message was being built. A
//! batch is *closed* once a frame without `SNDMORE` has been appended; only
//! closed batches are ever handed to a transport, so the frames of a message
//! can never be split across separately timed sends.
//!
//! The batch also remembers how many of its frames the transport already
//! accepted. When a transmit attempt is cut short by backpressure, the batch
//! goes back to the head of the queue and the next attempt resumes at the
//! first unsent frame: nothing is duplicated, nothing is dropped.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::frame::{Frame, SendFlags};

/// Completion callback attached to a send.
///
/// Receives the owning socket and `Ok(())` once every frame of the batch was
/// accepted by the transport, or the error that terminated the batch.
pub type SendCallback<C> = Box<dyn FnOnce(&C, std::result::Result<(), &Error>)>;

/// One or more frames that must leave as a single message.
pub struct OutboundBatch<C> {
    frames: SmallVec<[(Frame, SendFlags); 4]>,
    callbacks: SmallVec<[SendCallback<C>; 1]>,
    closed: bool,
    sent: usize,
}

impl<C> OutboundBatch<C> {
    /// Create an empty, open batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: SmallVec::new(),
            callbacks: SmallVec::new(),
            closed: false,
            sent: 0,
        }
    }

    /// Append a frame. A frame without `SNDMORE` closes the batch.
    ///
    /// Appending to a closed batch cannot happen through
    /// [`OutboundQueue`](crate::queue::OutboundQueue), which always starts a
    /// new batch once the tail is closed.
    pub fn append(&mut self, frame: Frame, flags: SendFlags, callback: Option<SendCallback<C>>) {
        debug_assert!(!self.closed, "append to a closed batch");
        self.frames.push((frame, flags));

        if let Some(cb) = callback {
            self.callbacks.push(cb);
        }

        if !flags.more() {
            self.closed = true;
        }
    }

    /// Whether the final frame of the message has been appended.
    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total number of frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame was appended yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames the transport already accepted.
    #[inline]
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Whether every frame was accepted.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent == self.frames.len()
    }

    /// Number of registered completion callbacks.
    #[inline]
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// The first frame not yet accepted by the transport.
    #[must_use]
    pub fn next_unsent(&self) -> Option<(&Frame, SendFlags)> {
        self.frames.get(self.sent).map(|(frame, flags)| (frame, *flags))
    }

    /// Record that the frame returned by [`next_unsent`](Self::next_unsent)
    /// was accepted.
    pub fn mark_sent(&mut self) {
        debug_assert!(self.sent < self.frames.len());
        self.sent += 1;
    }

    /// Borrow all frames with their flags, in append order.
    pub fn frames(&self) -> impl Iterator<Item = (&Frame, SendFlags)> {
        self.frames.iter().map(|(frame, flags)| (frame, *flags))
    }

    /// Report success to every callback, in append order.
    pub fn invoke_sent(self, ctx: &C) {
        for cb in self.callbacks {
            cb(ctx, Ok(()));
        }
    }

    /// Report `error` to every callback, in append order.
    ///
    /// # Errors
    ///
    /// When no callback was registered the error is handed back, so a send
    /// failure nobody asked to hear about asynchronously still reaches the
    /// caller.
    pub fn invoke_error(self, ctx: &C, error: Error) -> Result<()> {
        if self.callbacks.is_empty() {
            return Err(error);
        }

        for cb in self.callbacks {
            cb(ctx, Err(&error));
        }
        Ok(())
    }
}

impl<C> Default for OutboundBatch<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for OutboundBatch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundBatch")
            .field("frames", &self.frames.len())
            .field("sent", &self.sent)
            .field("callbacks", &self.callbacks.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> SendCallback<()> {
        let log = Rc::clone(log);
        Box::new(move |_, res| {
            let entry = match res {
                Ok(()) => format!("{tag}:ok"),
                Err(e) => format!("{tag}:{e}"),
            };
            log.borrow_mut().push(entry);
        })
    }

    #[test]
    fn test_closes_on_final_frame() {
        let mut batch = OutboundBatch::<()>::new();
        batch.append(Frame::from("a"), SendFlags::SNDMORE, None);
        assert!(!batch.is_closed());
        batch.append(Frame::from("b"), SendFlags::NONE, None);
        assert!(batch.is_closed());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_cursor_tracks_accepted_frames() {
        let mut batch = OutboundBatch::<()>::new();
        batch.append(Frame::from("a"), SendFlags::SNDMORE, None);
        batch.append(Frame::from("b"), SendFlags::NONE, None);

        let (frame, flags) = batch.next_unsent().unwrap();
        assert_eq!(&frame[..], b"a");
        assert!(flags.more());
        batch.mark_sent();

        let (frame, flags) = batch.next_unsent().unwrap();
        assert_eq!(&frame[..], b"b");
        assert!(!flags.more());
        batch.mark_sent();

        assert!(batch.is_complete());
        assert!(batch.next_unsent().is_none());
    }

    #[test]
    fn test_invoke_sent_in_append_order() {
        let log: Log = Rc::default();
        let mut batch = OutboundBatch::new();
        batch.append(Frame::from("a"), SendFlags::SNDMORE, Some(recorder(&log, "first")));
        batch.append(Frame::from("b"), SendFlags::NONE, Some(recorder(&log, "second")));

        batch.invoke_sent(&());
        assert_eq!(*log.borrow(), vec!["first:ok", "second:ok"]);
    }

    #[test]
    fn test_invoke_error_reaches_every_callback() {
        let log: Log = Rc::default();
        let mut batch = OutboundBatch::new();
        batch.append(Frame::from("a"), SendFlags::SNDMORE, Some(recorder(&log, "first")));
        batch.append(Frame::from("b"), SendFlags::NONE, Some(recorder(&log, "second")));

        let res = batch.invoke_error(&(), Error::SocketClosed);
        assert!(res.is_ok());
        assert_eq!(
            *log.borrow(),
            vec!["first:Socket closed", "second:Socket closed"]
        );
    }

    #[test]
    fn test_invoke_error_without_callbacks_hands_error_back() {
        let mut batch = OutboundBatch::<()>::new();
        batch.append(Frame::from("a"), SendFlags::NONE, None);

        let res = batch.invoke_error(&(), Error::invalid_state("busy"));
        assert!(matches!(res, Err(Error::InvalidState(_))));
    }
}
