//! # Flowsock Inproc
//!
//! In-process transport for the flowsock engine.
//!
//! Sockets created from one [`Context`] meet at `inproc://name` endpoints and
//! exchange complete messages through per-socket mailboxes. The transport
//! implements the messaging patterns on top of that:
//! - **PAIR**: exclusive pair
//! - **PUB / SUB / XPUB / XSUB**: prefix-filtered publish/subscribe
//! - **REQ / REP**: strict request/reply alternation
//! - **DEALER / ROUTER**: load-balanced requests and identity routing
//! - **PUSH / PULL**: round-robin pipeline
//!
//! Readiness edges (readable, writable) are raised through the
//! [`ReadyNotifier`](flowsock_core::transport::ReadyNotifier) the engine
//! installs, never by calling back into the socket.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowsock_core::socket::Socket;
//! use flowsock_core::socket_type::SocketType;
//! use flowsock_inproc::Context;
//!
//! # fn main() -> flowsock_core::Result<()> {
//! let ctx = Context::new();
//! let pull = Socket::new(ctx.socket(SocketType::Pull)?);
//! let push = Socket::new(ctx.socket(SocketType::Push)?);
//!
//! pull.bind("inproc://pipeline")?;
//! push.connect("inproc://pipeline")?;
//! push.send("job")?;
//!
//! let msg = pull.read()?.expect("delivered");
//! assert_eq!(msg.single().unwrap(), &b"job"[..]);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]

pub mod context;
pub mod endpoint;
pub(crate) mod mailbox;
pub mod subscription;
pub mod transport;

pub use context::{Context, ContextOption, ContextOptions};
pub use endpoint::InprocEndpoint;
pub use subscription::{SubscriptionRequest, SubscriptionSet};
pub use transport::InprocTransport;
