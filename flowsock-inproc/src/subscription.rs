//! Prefix subscriptions for SUB/XSUB mailboxes.

use bytes::Bytes;
use hashbrown::HashMap;

/// Subscription byte marking a subscribe request on the XSUB/XPUB wire.
pub const SUBSCRIBE: u8 = 0x01;
/// Subscription byte marking an unsubscribe request.
pub const UNSUBSCRIBE: u8 = 0x00;

/// Reference-counted prefix set.
///
/// Subscribing twice to the same prefix needs two unsubscribes to remove it.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionSet {
    prefixes: HashMap<Bytes, usize>,
}

impl SubscriptionSet {
    /// Create an empty set, matching nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix. Returns `true` if it was new.
    pub fn subscribe(&mut self, prefix: Bytes) -> bool {
        let count = self.prefixes.entry(prefix).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drop one reference to a prefix. Returns `true` if it is now gone.
    pub fn unsubscribe(&mut self, prefix: &[u8]) -> bool {
        match self.prefixes.get_mut(prefix) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.prefixes.remove(prefix);
                true
            }
            None => false,
        }
    }

    /// Whether `topic` starts with any subscribed prefix. An empty prefix
    /// matches everything; an empty set matches nothing.
    #[must_use]
    pub fn matches(&self, topic: &[u8]) -> bool {
        self.prefixes.keys().any(|p| topic.starts_with(p))
    }

    /// Distinct prefixes.
    pub fn prefixes(&self) -> impl Iterator<Item = &Bytes> {
        self.prefixes.keys()
    }

    /// Number of distinct prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether no prefix is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// A subscribe or unsubscribe request travelling upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionRequest {
    /// Add a prefix
    Subscribe(Bytes),
    /// Remove a prefix
    Unsubscribe(Bytes),
}

impl SubscriptionRequest {
    /// Decode `[0x01|0x00] prefix...`.
    #[must_use]
    pub fn from_frame(frame: &Bytes) -> Option<Self> {
        let (&cmd, _) = frame.split_first()?;
        let prefix = frame.slice(1..);
        match cmd {
            SUBSCRIBE => Some(Self::Subscribe(prefix)),
            UNSUBSCRIBE => Some(Self::Unsubscribe(prefix)),
            _ => None,
        }
    }

    /// Encode as a single frame.
    #[must_use]
    pub fn to_frame(&self) -> Bytes {
        let (cmd, prefix) = match self {
            Self::Subscribe(p) => (SUBSCRIBE, p),
            Self::Unsubscribe(p) => (UNSUBSCRIBE, p),
        };
        let mut frame = Vec::with_capacity(1 + prefix.len());
        frame.push(cmd);
        frame.extend_from_slice(prefix);
        Bytes::from(frame)
    }

    /// Apply to a subscription set. Returns whether the set changed.
    pub fn apply(&self, set: &mut SubscriptionSet) -> bool {
        match self {
            Self::Subscribe(p) => set.subscribe(p.clone()),
            Self::Unsubscribe(p) => set.unsubscribe(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = SubscriptionSet::new();
        assert!(!set.matches(b"anything"));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let mut set = SubscriptionSet::new();
        set.subscribe(Bytes::new());
        assert!(set.matches(b"tobi"));
        assert!(set.matches(b""));
    }

    #[test]
    fn test_prefix_matching() {
        let mut set = SubscriptionSet::new();
        set.subscribe(Bytes::from_static(b"topic."));
        assert!(set.matches(b"topic.foo"));
        assert!(!set.matches(b"other.foo"));
        assert!(!set.matches(b"topi"));
    }

    #[test]
    fn test_subscriptions_are_counted() {
        let mut set = SubscriptionSet::new();
        assert!(set.subscribe(Bytes::from_static(b"a")));
        assert!(!set.subscribe(Bytes::from_static(b"a")));
        assert!(!set.unsubscribe(b"a"));
        assert!(set.matches(b"abc"));
        assert!(set.unsubscribe(b"a"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_request_frames() {
        let req = SubscriptionRequest::Subscribe(Bytes::from_static(b"topic"));
        let frame = req.to_frame();
        assert_eq!(&frame[..], b"\x01topic");
        assert_eq!(SubscriptionRequest::from_frame(&frame), Some(req));

        assert_eq!(
            SubscriptionRequest::from_frame(&Bytes::from_static(b"\x00x")),
            Some(SubscriptionRequest::Unsubscribe(Bytes::from_static(b"x")))
        );
        assert_eq!(SubscriptionRequest::from_frame(&Bytes::from_static(b"\x05")), None);
        assert_eq!(SubscriptionRequest::from_frame(&Bytes::new()), None);
    }
}
