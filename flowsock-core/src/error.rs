//! Flowsock Error Types
//!
//! One error enum covers every failure the engine or a transport can report.
//! Transient backpressure is deliberately absent: a transport that cannot
//! accept a frame right now answers [`SendStatus::WouldBlock`], which is a
//! normal outcome and never surfaces as an error.
//!
//! [`SendStatus::WouldBlock`]: crate::transport::SendStatus::WouldBlock

use std::io;

use bytes::Bytes;
use thiserror::Error;

use crate::socket_type::SocketType;

/// Main error type for flowsock operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error reported by a transport
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Operation attempted on a closed socket
    #[error("Socket closed")]
    SocketClosed,

    /// ROUTER could not find a peer for the addressed identity
    #[error("No route to host")]
    Unroutable {
        /// Identity frame the message was addressed to
        identity: Bytes,
    },

    /// The pattern's state machine forbids the operation right now
    #[error("Operation cannot be accomplished in current state: {0}")]
    InvalidState(String),

    /// The pattern does not support the operation at all
    #[error("{op} is not supported by {socket_type} sockets")]
    Unsupported {
        /// Operation name
        op: &'static str,
        /// Pattern of the socket the call was made on
        socket_type: SocketType,
    },

    /// Unknown socket pattern name
    #[error("Socket type \"{0}\" not supported")]
    UnknownSocketType(String),

    /// Unknown socket or context option name
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Unknown send flag name
    #[error("Unknown flag name: {0}")]
    UnknownFlag(String),

    /// Unknown event name
    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    /// Option value has the wrong shape or the option is read-only
    #[error("Invalid value for option {option}: {reason}")]
    InvalidOptionValue {
        /// Option name
        option: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Endpoint already bound by another socket
    #[error("Address already in use: {0}")]
    AddrInUse(String),

    /// Nothing is bound at the endpoint
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Malformed endpoint string
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Context socket limit reached
    #[error("Too many open sockets (max: {0})")]
    TooManySockets(usize),

    /// Message exceeded the configured byte limit
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Message exceeded the configured frame limit
    #[error("Too many frames in message (max: {max})")]
    TooManyFrames { max: usize },

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for flowsock operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error with a message
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid state error with a message
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the socket usable; the failed message is
    /// reported once and later sends proceed normally.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::Unroutable { .. }
            | Self::InvalidState(_)
            | Self::MessageTooLarge { .. }
            | Self::TooManyFrames { .. } => true,
            _ => false,
        }
    }

    /// Check if this error is caller misuse, raised at the call site and
    /// never queued.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. }
                | Self::UnknownSocketType(_)
                | Self::UnknownOption(_)
                | Self::UnknownFlag(_)
                | Self::UnknownEvent(_)
                | Self::InvalidOptionValue { .. }
                | Self::InvalidEndpoint(_)
        )
    }
}
