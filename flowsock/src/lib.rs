//! # Flowsock
//!
//! Non-blocking multipart message sockets with edge-triggered drain loops.
//!
//! ## Architecture
//!
//! - **`flowsock-core`**: the socket engine. Outbound batches and queue,
//!   readiness gate, send and receive drain loops, pause/resume flow control,
//!   event listeners and the option map. Transport-agnostic.
//! - **`flowsock-inproc`**: in-process transport with the messaging patterns
//!   (PAIR, PUB/SUB, XPUB/XSUB, REQ/REP, DEALER/ROUTER, PUSH/PULL).
//! - **`flowsock`**: public API surface (this crate).
//!
//! ## Quick Start
//!
//! ```rust
//! use flowsock::prelude::*;
//!
//! # fn main() -> flowsock::Result<()> {
//! let pull = flowsock::socket(SocketType::Pull)?;
//! let push = flowsock::socket(SocketType::Push)?;
//! pull.bind("inproc://quickstart")?;
//! push.connect("inproc://quickstart")?;
//!
//! push.send(["header", "body"])?;
//! let msg = pull.read()?.expect("delivered in-process");
//! assert_eq!(msg.to_strings(), ["header", "body"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Readiness
//!
//! Transports raise readable/writable edges asynchronously. A socket applies
//! them when the application calls [`Socket::process_ready`] (non-blocking)
//! or awaits [`Socket::ready`]; each edge runs the matching drain loop, which
//! emits `message` events and pushes queued sends out.

#![warn(missing_docs)]
#![warn(clippy::all)]

use once_cell::sync::Lazy;
use tracing::debug;

pub mod dev_tracing;
pub mod stream;

// Re-export core types
pub use bytes::Bytes;
pub use flowsock_core::error::{Error, Result};
pub use flowsock_core::events::{EventKind, ListenerId, SocketEvent};
pub use flowsock_core::frame::{Frame, Parts, SendFlags};
pub use flowsock_core::gate::Readiness;
pub use flowsock_core::message::Message;
pub use flowsock_core::options::{OptionValue, SocketOption, SocketOptions};
pub use flowsock_core::socket_type::SocketType;
pub use flowsock_core::transport::{ReadyNotifier, SendStatus, Transport};
pub use flowsock_inproc::{Context, ContextOption, ContextOptions, InprocTransport};

/// A socket on the in-process transport.
pub type Socket = flowsock_core::socket::Socket<InprocTransport>;

/// Readable-stream adapter over [`Socket`].
pub type MessageStream = stream::MessageStream<InprocTransport>;

/// Writable-sink adapter over [`Socket`].
pub type MessageSink = stream::MessageSink<InprocTransport>;

static DEFAULT_CONTEXT: Lazy<Context> = Lazy::new(|| {
    let options = ContextOptions::from_env();
    debug!("creating default context (io_threads: {})", options.io_threads);
    Context::with_options(options)
});

/// The process-wide context used by [`socket`] and [`create_socket`].
///
/// Created on first use with [`ContextOptions::from_env`]. Sockets that need
/// isolation (tests, libraries) should own a [`Context`] and use
/// [`socket_in`] instead.
pub fn default_context() -> &'static Context {
    &DEFAULT_CONTEXT
}

/// Create a socket on the default context.
///
/// # Errors
///
/// Socket limit reached, or a pattern the in-process transport does not
/// serve (STREAM).
pub fn socket(socket_type: SocketType) -> Result<Socket> {
    socket_in(default_context(), socket_type)
}

/// Create a socket on `ctx`.
///
/// # Errors
///
/// As [`socket`].
pub fn socket_in(ctx: &Context, socket_type: SocketType) -> Result<Socket> {
    Ok(Socket::new(ctx.socket(socket_type)?))
}

/// Create a socket by pattern name (`"push"`, `"ZMQ_PUSH"`, `"xrep"`...) on
/// the default context and apply `options`.
///
/// # Errors
///
/// [`Error::UnknownSocketType`], then as [`socket`], then any option the
/// socket rejects. A socket that fails option setup is closed before the
/// error is returned.
///
/// # Examples
///
/// ```rust
/// use flowsock::SocketOptions;
///
/// let options = SocketOptions::new().with_send_hwm(10).with_linger(0);
/// let push = flowsock::create_socket("push", &options).unwrap();
/// assert_eq!(push.get_option_by_name("sndhwm").unwrap().as_int(), Some(10));
/// ```
pub fn create_socket(name: &str, options: &SocketOptions) -> Result<Socket> {
    create_socket_in(default_context(), name, options)
}

/// [`create_socket`] on an explicit context.
///
/// # Errors
///
/// As [`create_socket`].
pub fn create_socket_in(ctx: &Context, name: &str, options: &SocketOptions) -> Result<Socket> {
    let socket_type: SocketType = name.parse()?;
    let socket = socket_in(ctx, socket_type)?;
    // Through the engine, so size limits reach the assembler too.
    for (option, value) in options.iter() {
        if let Err(e) = socket.set_option(option, value.clone()) {
            socket.close();
            return Err(e);
        }
    }
    Ok(socket)
}

/// Convenient imports for applications.
pub mod prelude {
    pub use crate::{
        Bytes, Context, ContextOptions, Error, EventKind, Message, MessageSink, MessageStream,
        OptionValue, Readiness, Result, SendFlags, Socket, SocketEvent, SocketOption,
        SocketOptions, SocketType,
    };
}
