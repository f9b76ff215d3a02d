use bytes::Bytes;

use crate::error::{Error, Result};
use crate::message::Message;

/// Default frame limit per message.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Collects received frames until a complete multipart message is formed.
///
/// Invariants:
/// - Frames are appended in-order
/// - A message completes on the first frame with `more == false`
/// - Limits are enforced eagerly; a violating message is discarded whole
///
/// Frames of a partially received message survive across drain runs, so a
/// message is never torn apart when the transport runs dry mid-message.
#[derive(Debug)]
pub struct MultipartAssembler {
    frames: Vec<Bytes>,
    byte_count: usize,
    discarding: bool,

    max_frames: usize,
    max_bytes: Option<usize>,
}

impl MultipartAssembler {
    /// Create an assembler with limits. `max_bytes == None` means unlimited.
    #[must_use]
    pub fn new(max_frames: usize, max_bytes: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            byte_count: 0,
            discarding: false,
            max_frames,
            max_bytes,
        }
    }

    /// Push a frame into the assembler.
    ///
    /// Returns:
    /// - `Ok(None)` if the message is not complete
    /// - `Ok(Some(Message))` if a full message was assembled
    ///
    /// # Errors
    ///
    /// [`Error::TooManyFrames`] or [`Error::MessageTooLarge`] when a limit is
    /// exceeded. The partial message is dropped; frames that still belong to
    /// it are skipped until its final frame.
    pub fn push_frame(&mut self, frame: Bytes, more: bool) -> Result<Option<Message>> {
        if self.discarding {
            self.discarding = more;
            return Ok(None);
        }

        if self.frames.len() >= self.max_frames {
            self.reset();
            self.discarding = more;
            return Err(Error::TooManyFrames {
                max: self.max_frames,
            });
        }

        self.byte_count += frame.len();
        if let Some(max) = self.max_bytes {
            if self.byte_count > max {
                let size = self.byte_count;
                self.reset();
                self.discarding = more;
                return Err(Error::MessageTooLarge { size, max });
            }
        }

        self.frames.push(frame);

        if more {
            Ok(None)
        } else {
            let msg = Message::from_frames(std::mem::take(&mut self.frames));
            self.reset();
            Ok(Some(msg))
        }
    }

    /// Whether frames of an unfinished message are held.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Number of frames held for the unfinished message.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Replace the byte limit, e.g. after `ZMQ_MAXMSGSIZE` changed.
    pub fn set_max_bytes(&mut self, max_bytes: Option<usize>) {
        self.max_bytes = max_bytes;
    }

    /// Drop any partial message.
    ///
    /// Does not touch the skip state of a message that already failed a
    /// limit check.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.byte_count = 0;
    }
}

impl Default for MultipartAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAMES, None)
    }
}
