//! Transport context.
//!
//! A [`Context`] is the shared resource sockets are created from: it owns the
//! endpoint registry that `bind` and `connect` meet in, and enforces the
//! socket limit. Contexts are cheap to clone and can be shared across
//! threads; sockets created from them are single-threaded.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use flowsock_core::error::{Error, Result};
use flowsock_core::options::SocketOptions;
use flowsock_core::socket_type::SocketType;
use flowsock_core::transport::Transport;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::mailbox::Mailbox;
use crate::transport::InprocTransport;

/// Environment variable read by [`ContextOptions::from_env`].
pub const IO_THREADS_ENV: &str = "ZMQ_IO_THREADS";

/// Default socket limit per context.
pub const DEFAULT_MAX_SOCKETS: usize = 1023;

/// Context-level option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextOption {
    /// Size of the I/O thread pool (ZMQ_IO_THREADS)
    IoThreads,
    /// Maximum number of open sockets (ZMQ_MAX_SOCKETS)
    MaxSockets,
}

impl ContextOption {
    /// Lowercase short name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IoThreads => "io_threads",
            Self::MaxSockets => "max_sockets",
        }
    }
}

impl fmt::Display for ContextOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContextOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_prefix("zmq_").unwrap_or(&lower) {
            "io_threads" => Ok(Self::IoThreads),
            "max_sockets" => Ok(Self::MaxSockets),
            _ => Err(Error::UnknownOption(s.to_string())),
        }
    }
}

/// Context configuration.
///
/// In-process messaging needs no I/O threads; `io_threads` is kept so
/// configuration written for other transports carries over unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// I/O thread pool size
    pub io_threads: usize,
    /// Socket limit
    pub max_sockets: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            io_threads: 1,
            max_sockets: DEFAULT_MAX_SOCKETS,
        }
    }
}

impl ContextOptions {
    /// Defaults, with `io_threads` taken from `ZMQ_IO_THREADS` when set.
    ///
    /// Unparsable or zero values fall back to 1.
    #[must_use]
    pub fn from_env() -> Self {
        let io_threads = std::env::var(IO_THREADS_ENV)
            .ok()
            .map_or(1, |raw| Self::parse_io_threads(&raw));
        Self {
            io_threads,
            ..Self::default()
        }
    }

    fn parse_io_threads(raw: &str) -> usize {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!("{}={:?} is not a positive integer, using 1", IO_THREADS_ENV, raw);
                1
            }
        }
    }

    /// Set the I/O thread count.
    #[must_use]
    pub const fn with_io_threads(mut self, n: usize) -> Self {
        self.io_threads = n;
        self
    }

    /// Set the socket limit.
    #[must_use]
    pub const fn with_max_sockets(mut self, n: usize) -> Self {
        self.max_sockets = n;
        self
    }
}

pub(crate) struct ContextInner {
    registry: DashMap<String, Weak<Mailbox>>,
    options: RwLock<ContextOptions>,
    open_sockets: AtomicUsize,
    next_id: AtomicU64,
}

/// Shared transport context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a context with explicit options.
    #[must_use]
    pub fn with_options(options: ContextOptions) -> Self {
        debug!(
            "context created (io_threads: {}, max_sockets: {})",
            options.io_threads, options.max_sockets
        );
        Self {
            inner: Arc::new(ContextInner {
                registry: DashMap::new(),
                options: RwLock::new(options),
                open_sockets: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> ContextOptions {
        *self.inner.options.read()
    }

    /// Read one option.
    #[must_use]
    pub fn get(&self, option: ContextOption) -> usize {
        let options = self.inner.options.read();
        match option {
            ContextOption::IoThreads => options.io_threads,
            ContextOption::MaxSockets => options.max_sockets,
        }
    }

    /// Change one option.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOptionValue`] for zero.
    pub fn set(&self, option: ContextOption, value: usize) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidOptionValue {
                option: option.name(),
                reason: "must be at least 1".into(),
            });
        }
        let mut options = self.inner.options.write();
        match option {
            ContextOption::IoThreads => options.io_threads = value,
            ContextOption::MaxSockets => options.max_sockets = value,
        }
        Ok(())
    }

    /// Number of sockets created from this context and not yet closed.
    #[must_use]
    pub fn open_sockets(&self) -> usize {
        self.inner.open_sockets.load(Ordering::Acquire)
    }

    /// Create a transport handle with default options.
    ///
    /// # Errors
    ///
    /// [`Error::TooManySockets`] at the limit; [`Error::Unsupported`] for
    /// STREAM, which has no in-process form.
    pub fn socket(&self, socket_type: SocketType) -> Result<InprocTransport> {
        self.socket_with(socket_type, &SocketOptions::default())
    }

    /// Create a transport handle and apply `options`.
    ///
    /// # Errors
    ///
    /// As [`socket`](Self::socket), plus option rejections.
    pub fn socket_with(
        &self,
        socket_type: SocketType,
        options: &SocketOptions,
    ) -> Result<InprocTransport> {
        if socket_type == SocketType::Stream {
            return Err(Error::Unsupported {
                op: "inproc socket",
                socket_type,
            });
        }

        let max = self.get(ContextOption::MaxSockets);
        let reserved = self
            .inner
            .open_sockets
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            });
        if reserved.is_err() {
            return Err(Error::TooManySockets(max));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut transport = InprocTransport::new(self.clone(), Mailbox::new(id, socket_type));
        for (option, value) in options.iter() {
            if let Err(e) = transport.set_option(option, value.clone()) {
                transport.close();
                return Err(e);
            }
        }
        Ok(transport)
    }

    pub(crate) fn release_socket(&self) {
        self.inner.open_sockets.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn register(&self, name: &str, mailbox: &Arc<Mailbox>) -> Result<()> {
        match self.inner.registry.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().strong_count() > 0 {
                    return Err(Error::AddrInUse(format!("inproc://{name}")));
                }
                entry.insert(Arc::downgrade(mailbox));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::downgrade(mailbox));
            }
        }
        Ok(())
    }

    /// Remove `name` if it is registered to `mailbox_id`.
    pub(crate) fn unregister(&self, name: &str, mailbox_id: u64) -> bool {
        self.inner
            .registry
            .remove_if(name, |_, weak| {
                weak.upgrade().map_or(true, |m| m.id() == mailbox_id)
            })
            .is_some()
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<Mailbox>> {
        self.inner.registry.get(name).and_then(|w| w.upgrade())
    }

    /// Bound endpoint names, for debugging.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.inner
            .registry
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .map(|entry| format!("inproc://{}", entry.key()))
            .collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options())
            .field("open_sockets", &self.open_sockets())
            .finish_non_exhaustive()
    }
}
