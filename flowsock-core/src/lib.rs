//! Flowsock Core
//!
//! This crate contains the transport-agnostic message engine:
//! - Outbound batching and queueing (`batch`, `queue`)
//! - Readiness edges and the drain re-entrancy gate (`gate`)
//! - Multipart reassembly on receive (`assembler`)
//! - The socket engine with its send/receive drain loops (`socket`)
//! - The transport seam (`transport`)
//! - Event listeners, options, frames and error types

#![cfg_attr(not(test), deny(unsafe_code))]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]

pub mod assembler;
pub mod batch;
pub mod error;
pub mod events;
pub mod frame;
pub mod gate;
pub mod message;
pub mod options;
pub mod queue;
pub mod socket;
pub mod socket_type;
pub mod transport;

pub use error::{Error, Result};

// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventKind, ListenerId, SocketEvent};
    pub use crate::frame::{Frame, Parts, SendFlags};
    pub use crate::gate::Readiness;
    pub use crate::message::Message;
    pub use crate::options::{OptionValue, SocketOption, SocketOptions};
    pub use crate::socket::Socket;
    pub use crate::socket_type::SocketType;
    pub use crate::transport::{ReadyNotifier, SendStatus, Transport};
}
