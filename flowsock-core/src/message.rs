//! Received multipart messages.
//!
//! A [`Message`] is what the receive drain hands to `message` listeners and
//! what `read()` returns: every frame of one logical message, in arrival
//! order.

use std::io;
use std::ops::Deref;

use bytes::Bytes;

/// A complete received message.
///
/// # Examples
///
/// ```
/// use flowsock_core::message::Message;
/// use bytes::Bytes;
///
/// let msg = Message::from_frames(vec![Bytes::from("topic"), Bytes::from("body")]);
/// assert_eq!(msg.len(), 2);
/// assert!(msg.single().is_none());
/// assert_eq!(msg.parse_frame_str(1).unwrap(), "body");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    frames: Vec<Bytes>,
}

impl Message {
    /// Create a message from existing frames.
    #[must_use]
    pub const fn from_frames(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// Get the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the message has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The bare payload of a single-frame message.
    ///
    /// Returns `None` for multipart messages, whose frames are read through
    /// [`frames`](Self::frames).
    #[must_use]
    pub fn single(&self) -> Option<&Bytes> {
        match self.frames.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Get a reference to the frames.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Consume the message and return the frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    /// Try to parse a frame as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame doesn't exist or isn't valid UTF-8.
    pub fn parse_frame_str(&self, index: usize) -> io::Result<&str> {
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Frame index out of bounds"))?;

        std::str::from_utf8(frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// All frames decoded as UTF-8, lossily. Mostly useful in tests and logs.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

impl Deref for Message {
    type Target = [Bytes];

    fn deref(&self) -> &[Bytes] {
        &self.frames
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }
}

impl From<Message> for Vec<Bytes> {
    fn from(msg: Message) -> Self {
        msg.frames
    }
}
