//! Outbound frames, send flags and the conversions `send()` accepts.
//!
//! Anything an application hands to `send()` ends up as a [`Frame`]: text is
//! encoded as UTF-8, numbers are stringified, byte buffers are taken as-is.
//! [`Parts`] is the single-or-multipart wrapper `send()` takes.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Deref};
use std::str::FromStr;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// One message part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Frame(Bytes);

impl Frame {
    /// Create a frame from any byte source.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Empty delimiter frame.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Borrow the payload.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume the frame and return its payload.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Frame {
    fn from(bytes: &[u8; N]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

impl From<&String> for Frame {
    fn from(text: &String) -> Self {
        Self::from(text.as_str())
    }
}

macro_rules! frame_from_number {
    ($($num:ty),*) => {
        $(
            impl From<$num> for Frame {
                fn from(value: $num) -> Self {
                    Self(Bytes::from(value.to_string()))
                }
            }
        )*
    };
}

frame_from_number!(i32, i64, u32, u64, usize, f64);

/// Send flags attached to each queued frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SendFlags(u8);

impl SendFlags {
    /// No flags: the frame closes its message.
    pub const NONE: Self = Self(0);
    /// Non-blocking hint; the engine never blocks, so it only travels along.
    pub const DONTWAIT: Self = Self(1);
    /// More frames of the same message follow.
    pub const SNDMORE: Self = Self(2);

    /// Raw bit value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the frame leaves its message open.
    #[must_use]
    pub const fn more(self) -> bool {
        self.contains(Self::SNDMORE)
    }

    /// Combine several flag names, as in `["sndmore", "dontwait"]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFlag`] for any unrecognised name.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(Self::NONE, |acc, name| Ok(acc | name.as_ref().parse::<Self>()?))
    }
}

impl BitOr for SendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SendFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromStr for SendFlags {
    type Err = Error;

    /// Accepts `"sndmore"` and `"ZMQ_SNDMORE"` style names.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_prefix("zmq_").unwrap_or(&lower) {
            "sndmore" => Ok(Self::SNDMORE),
            "dontwait" | "noblock" => Ok(Self::DONTWAIT),
            _ => Err(Error::UnknownFlag(s.to_string())),
        }
    }
}

impl fmt::Display for SendFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::DONTWAIT) {
            names.push("DONTWAIT");
        }
        if self.contains(Self::SNDMORE) {
            names.push("SNDMORE");
        }
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// The value passed to `send()`: one frame, or a whole multipart message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parts(SmallVec<[Frame; 4]>);

impl Parts {
    /// Create from already converted frames.
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self(frames.into_iter().collect())
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    /// Pair each frame with the flags it is queued with: every part but the
    /// last carries `SNDMORE`; the last carries exactly `flags`.
    pub fn with_flags(self, flags: SendFlags) -> impl Iterator<Item = (Frame, SendFlags)> {
        let last = self.0.len().saturating_sub(1);
        self.0.into_iter().enumerate().map(move |(i, frame)| {
            if i == last {
                (frame, flags)
            } else {
                (frame, flags | SendFlags::SNDMORE)
            }
        })
    }
}

impl IntoIterator for Parts {
    type Item = Frame;
    type IntoIter = smallvec::IntoIter<[Frame; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

macro_rules! parts_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Parts {
                fn from(value: $ty) -> Self {
                    let mut frames = SmallVec::new();
                    frames.push(Frame::from(value));
                    Self(frames)
                }
            }

            impl From<Vec<$ty>> for Parts {
                fn from(values: Vec<$ty>) -> Self {
                    Self(values.into_iter().map(Frame::from).collect())
                }
            }

            impl<const N: usize> From<[$ty; N]> for Parts {
                fn from(values: [$ty; N]) -> Self {
                    Self(values.into_iter().map(Frame::from).collect())
                }
            }
        )*
    };
}

parts_from!(Frame, Bytes, &str, String, i32, i64, u32, u64, usize, f64);

impl From<Vec<u8>> for Parts {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Frame::from(value))
    }
}

impl From<&[u8]> for Parts {
    fn from(value: &[u8]) -> Self {
        Self::from(Frame::from(value))
    }
}

impl<const N: usize> From<&[u8; N]> for Parts {
    fn from(value: &[u8; N]) -> Self {
        Self::from(Frame::from(value))
    }
}

impl From<Vec<Vec<u8>>> for Parts {
    fn from(values: Vec<Vec<u8>>) -> Self {
        Self(values.into_iter().map(Frame::from).collect())
    }
}

impl From<&[Bytes]> for Parts {
    fn from(values: &[Bytes]) -> Self {
        Self(values.iter().cloned().map(Frame::from).collect())
    }
}

impl From<&[&str]> for Parts {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().copied().map(Frame::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_utf8_encoded() {
        let frame = Frame::from("héllo");
        assert_eq!(&frame[..], "héllo".as_bytes());
    }

    #[test]
    fn test_numbers_are_stringified() {
        assert_eq!(&Frame::from(42_i32)[..], b"42");
        assert_eq!(&Frame::from(1.5_f64)[..], b"1.5");
        assert_eq!(&Frame::from(1.0_f64)[..], b"1");
    }

    #[test]
    fn test_flag_names() {
        assert_eq!("sndmore".parse::<SendFlags>().unwrap(), SendFlags::SNDMORE);
        assert_eq!("ZMQ_SNDMORE".parse::<SendFlags>().unwrap(), SendFlags::SNDMORE);
        let both = SendFlags::from_names(["sndmore", "dontwait"]).unwrap();
        assert!(both.more());
        assert!(both.contains(SendFlags::DONTWAIT));
        assert!(matches!(
            SendFlags::from_names(["sndmore", "nope"]),
            Err(Error::UnknownFlag(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_only_last_part_carries_caller_flags() {
        let flagged: Vec<_> = Parts::from(["a", "b", "c"])
            .with_flags(SendFlags::NONE)
            .map(|(_, flags)| flags.more())
            .collect();
        assert_eq!(flagged, vec![true, true, false]);

        let open: Vec<_> = Parts::from(["a", "b"])
            .with_flags(SendFlags::SNDMORE)
            .map(|(_, flags)| flags.more())
            .collect();
        assert_eq!(open, vec![true, true]);
    }

    #[test]
    fn test_byte_vec_is_a_single_part() {
        assert_eq!(Parts::from(vec![1_u8, 2, 3]).len(), 1);
        assert_eq!(Parts::from(vec![vec![1_u8], vec![2]]).len(), 2);
    }
}
