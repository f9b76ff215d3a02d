//! Socket pattern enumeration.
//!
//! The routing behaviour behind each pattern belongs to the transport; the
//! engine only needs to know which directions a pattern supports and how to
//! parse a pattern from its name.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Messaging patterns a socket can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketType {
    /// PAIR socket for exclusive bidirectional communication
    Pair = 0,

    /// PUB socket for publishing messages to subscribers
    Pub = 1,

    /// SUB socket for subscribing to published messages
    Sub = 2,

    /// REQ socket for strict request-reply client
    Req = 3,

    /// REP socket for strict request-reply server
    Rep = 4,

    /// DEALER socket for asynchronous request-reply patterns
    Dealer = 5,

    /// ROUTER socket for routing messages by identity
    Router = 6,

    /// PULL socket for receiving messages from pushers
    Pull = 7,

    /// PUSH socket for sending messages to pullers
    Push = 8,

    /// XPUB socket for extended publisher with subscription awareness
    XPub = 9,

    /// XSUB socket for extended subscriber with dynamic subscriptions
    XSub = 10,

    /// STREAM socket for raw connections
    Stream = 11,
}

impl SocketType {
    /// All patterns, in numeric order.
    pub const ALL: [Self; 12] = [
        Self::Pair,
        Self::Pub,
        Self::Sub,
        Self::Req,
        Self::Rep,
        Self::Dealer,
        Self::Router,
        Self::Pull,
        Self::Push,
        Self::XPub,
        Self::XSub,
        Self::Stream,
    ];

    /// Get the socket type as a string name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::XPub => "XPUB",
            Self::XSub => "XSUB",
            Self::Stream => "STREAM",
        }
    }

    /// Whether `send()` is meaningful for this pattern.
    pub const fn can_send(&self) -> bool {
        !matches!(self, Self::Sub | Self::Pull)
    }

    /// Whether received messages can arrive on this pattern.
    pub const fn can_recv(&self) -> bool {
        !matches!(self, Self::Pub | Self::Push)
    }

    /// Receive-only patterns, usable as a readable stream.
    pub const fn is_readable_only(&self) -> bool {
        matches!(self, Self::Pull | Self::Sub | Self::XSub)
    }

    /// Send-only patterns, usable as a writable sink.
    pub const fn is_writable_only(&self) -> bool {
        matches!(self, Self::Push | Self::Pub | Self::XPub)
    }

    /// Check if this socket type is compatible with the given peer type.
    pub fn is_compatible(&self, peer: SocketType) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub | Self::XPub, Self::Sub | Self::XSub)
                | (Self::Sub | Self::XSub, Self::Pub | Self::XPub)
                | (Self::Req, Self::Rep | Self::Router)
                | (Self::Rep, Self::Req | Self::Dealer)
                | (Self::Router, Self::Req | Self::Dealer | Self::Router)
                | (Self::Dealer, Self::Rep | Self::Router | Self::Dealer)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
        )
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SocketType {
    type Err = Error;

    /// Accepts `"push"` and `"ZMQ_PUSH"` style names, case-insensitively.
    /// `xreq` and `xrep` are the historical names of dealer and router.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let short = lower.strip_prefix("zmq_").unwrap_or(&lower);
        let ty = match short {
            "pair" => Self::Pair,
            "pub" => Self::Pub,
            "sub" => Self::Sub,
            "req" => Self::Req,
            "rep" => Self::Rep,
            "dealer" | "xreq" => Self::Dealer,
            "router" | "xrep" => Self::Router,
            "pull" => Self::Pull,
            "push" => Self::Push,
            "xpub" => Self::XPub,
            "xsub" => Self::XSub,
            "stream" => Self::Stream,
            _ => return Err(Error::UnknownSocketType(s.to_string())),
        };
        Ok(ty)
    }
}
