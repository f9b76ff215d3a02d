//! FIFO of outbound batches.
//!
//! Appends always target the tail batch while it is still open, and start a
//! new batch once it is closed. Only the head batch is ever inspected for
//! sending, and a batch that could not be fully transmitted is restored to
//! the head, ahead of everything queued after it.

use std::collections::VecDeque;

use crate::batch::{OutboundBatch, SendCallback};
use crate::frame::{Frame, SendFlags};

/// Ordered queue of [`OutboundBatch`] owned by one socket.
#[derive(Debug)]
pub struct OutboundQueue<C> {
    batches: VecDeque<OutboundBatch<C>>,
}

impl<C> OutboundQueue<C> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            batches: VecDeque::new(),
        }
    }

    /// Append a frame to the tail batch, opening a new batch if the tail is
    /// absent or already closed.
    pub fn append(&mut self, frame: Frame, flags: SendFlags, callback: Option<SendCallback<C>>) {
        let needs_batch = self.batches.back().map_or(true, OutboundBatch::is_closed);
        if needs_batch {
            self.batches.push_back(OutboundBatch::new());
        }

        if let Some(batch) = self.batches.back_mut() {
            batch.append(frame, flags, callback);
        }
    }

    /// Whether the head batch exists and is closed.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.batches.front().is_some_and(OutboundBatch::is_closed)
    }

    /// Detach the head batch if it is ready to send.
    pub fn fetch(&mut self) -> Option<OutboundBatch<C>> {
        if self.can_send() {
            self.batches.pop_front()
        } else {
            None
        }
    }

    /// Put a previously fetched batch back at the head.
    pub fn restore(&mut self, batch: OutboundBatch<C>) {
        self.batches.push_front(batch);
    }

    /// Number of queued batches, including an open tail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Number of closed batches, leaving out an open tail.
    #[must_use]
    pub fn closed_len(&self) -> usize {
        let open_tail = self.batches.back().is_some_and(|b| !b.is_closed());
        self.batches.len() - usize::from(open_tail)
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total frames still waiting for the transport.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.batches.iter().map(|b| b.len() - b.sent()).sum()
    }

    /// Drop everything. Pending callbacks are discarded without being called.
    pub fn clear(&mut self) -> usize {
        let dropped = self.batches.len();
        self.batches.clear();
        dropped
    }
}

impl<C> Default for OutboundQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
