//! Socket configuration options
//!
//! Options form a plain key-value map: a [`SocketOption`] key and an
//! [`OptionValue`]. Keys parse from both `"ZMQ_SNDHWM"` and `"sndhwm"` style
//! names. The engine interprets a few keys itself (`maxmsgsize`); the rest
//! are the transport's business and are passed through unchanged.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use hashbrown::HashMap;

use crate::error::{Error, Result};

/// Default send/receive high water mark, in messages.
pub const DEFAULT_HWM: usize = 1000;

/// Shape of the value an option takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Signed integer
    Int,
    /// Boolean (integers are accepted, non-zero is true)
    Bool,
    /// Byte string (text is UTF-8 encoded)
    Bytes,
}

/// Socket option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// I/O thread affinity bitmask (ZMQ_AFFINITY)
    Affinity,
    /// Pending connection backlog (ZMQ_BACKLOG)
    Backlog,
    /// Current readiness bitmask, read-only (ZMQ_EVENTS)
    Events,
    /// Queue only on completed connections (ZMQ_IMMEDIATE)
    Immediate,
    /// Last bound or connected endpoint, read-only (ZMQ_LAST_ENDPOINT)
    LastEndpoint,
    /// Linger period on close in ms, -1 = infinite (ZMQ_LINGER)
    Linger,
    /// Maximum inbound message size in bytes, -1 = unlimited (ZMQ_MAXMSGSIZE)
    MaxMsgSize,
    /// Multicast data rate (ZMQ_RATE)
    Rate,
    /// Kernel receive buffer size (ZMQ_RCVBUF)
    RcvBuf,
    /// Receive high water mark (ZMQ_RCVHWM)
    RcvHwm,
    /// More frames of the current message pending, read-only (ZMQ_RCVMORE)
    RcvMore,
    /// Reconnect interval in ms (ZMQ_RECONNECT_IVL)
    ReconnectIvl,
    /// Maximum reconnect interval in ms (ZMQ_RECONNECT_IVL_MAX)
    ReconnectIvlMax,
    /// Multicast recovery interval in ms (ZMQ_RECOVERY_IVL)
    RecoveryIvl,
    /// Report unroutable ROUTER messages as errors (ZMQ_ROUTER_MANDATORY)
    RouterMandatory,
    /// Socket identity (ZMQ_ROUTING_ID, historically ZMQ_IDENTITY)
    RoutingId,
    /// Kernel send buffer size (ZMQ_SNDBUF)
    SndBuf,
    /// Send high water mark (ZMQ_SNDHWM)
    SndHwm,
    /// Add a subscription prefix, write-only (ZMQ_SUBSCRIBE)
    Subscribe,
    /// Socket pattern number, read-only (ZMQ_TYPE)
    Type,
    /// Remove a subscription prefix, write-only (ZMQ_UNSUBSCRIBE)
    Unsubscribe,
    /// Pass duplicate subscriptions upstream (ZMQ_XPUB_VERBOSE)
    XpubVerbose,
}

impl SocketOption {
    /// Lowercase short name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Affinity => "affinity",
            Self::Backlog => "backlog",
            Self::Events => "events",
            Self::Immediate => "immediate",
            Self::LastEndpoint => "last_endpoint",
            Self::Linger => "linger",
            Self::MaxMsgSize => "maxmsgsize",
            Self::Rate => "rate",
            Self::RcvBuf => "rcvbuf",
            Self::RcvHwm => "rcvhwm",
            Self::RcvMore => "rcvmore",
            Self::ReconnectIvl => "reconnect_ivl",
            Self::ReconnectIvlMax => "reconnect_ivl_max",
            Self::RecoveryIvl => "recovery_ivl",
            Self::RouterMandatory => "router_mandatory",
            Self::RoutingId => "routing_id",
            Self::SndBuf => "sndbuf",
            Self::SndHwm => "sndhwm",
            Self::Subscribe => "subscribe",
            Self::Type => "type",
            Self::Unsubscribe => "unsubscribe",
            Self::XpubVerbose => "xpub_verbose",
        }
    }

    /// Value shape.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        match self {
            Self::Immediate | Self::RcvMore | Self::RouterMandatory | Self::XpubVerbose => {
                OptionKind::Bool
            }
            Self::LastEndpoint | Self::RoutingId | Self::Subscribe | Self::Unsubscribe => {
                OptionKind::Bytes
            }
            _ => OptionKind::Int,
        }
    }

    /// Options that can only be read.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Events | Self::LastEndpoint | Self::RcvMore | Self::Type
        )
    }

    /// Options that are actions rather than stored state.
    #[must_use]
    pub const fn is_write_only(&self) -> bool {
        matches!(self, Self::Subscribe | Self::Unsubscribe)
    }

    /// Check `value` against the option's shape and normalise it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOptionValue`] for read-only options or a value of the
    /// wrong shape.
    pub fn coerce(&self, value: OptionValue) -> Result<OptionValue> {
        if self.is_read_only() {
            return Err(Error::InvalidOptionValue {
                option: self.name(),
                reason: "option is read-only".into(),
            });
        }

        match (self.kind(), value) {
            (OptionKind::Int, OptionValue::Int(v)) => Ok(OptionValue::Int(v)),
            (OptionKind::Int, OptionValue::Bool(b)) => Ok(OptionValue::Int(i64::from(b))),
            (OptionKind::Bool, OptionValue::Bool(b)) => Ok(OptionValue::Bool(b)),
            (OptionKind::Bool, OptionValue::Int(v)) => Ok(OptionValue::Bool(v != 0)),
            (OptionKind::Bytes, OptionValue::Bytes(b)) => Ok(OptionValue::Bytes(b)),
            (kind, value) => Err(Error::InvalidOptionValue {
                option: self.name(),
                reason: format!("expected {kind:?}, got {value}"),
            }),
        }
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SocketOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let opt = match lower.strip_prefix("zmq_").unwrap_or(&lower) {
            "affinity" => Self::Affinity,
            "backlog" => Self::Backlog,
            "events" => Self::Events,
            "immediate" => Self::Immediate,
            "last_endpoint" => Self::LastEndpoint,
            "linger" => Self::Linger,
            "maxmsgsize" => Self::MaxMsgSize,
            "rate" => Self::Rate,
            "rcvbuf" => Self::RcvBuf,
            "rcvhwm" => Self::RcvHwm,
            "rcvmore" => Self::RcvMore,
            "reconnect_ivl" => Self::ReconnectIvl,
            "reconnect_ivl_max" => Self::ReconnectIvlMax,
            "recovery_ivl" => Self::RecoveryIvl,
            "router_mandatory" => Self::RouterMandatory,
            "routing_id" | "identity" => Self::RoutingId,
            "sndbuf" => Self::SndBuf,
            "sndhwm" => Self::SndHwm,
            "subscribe" => Self::Subscribe,
            "type" => Self::Type,
            "unsubscribe" => Self::Unsubscribe,
            "xpub_verbose" => Self::XpubVerbose,
            _ => return Err(Error::UnknownOption(s.to_string())),
        };
        Ok(opt)
    }
}

/// An option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Byte string value
    Bytes(Bytes),
}

impl OptionValue {
    /// Integer view; booleans read as 0/1.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Bytes(_) => None,
        }
    }

    /// Boolean view; integers read as non-zero.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            Self::Bytes(_) => None,
        }
    }

    /// Byte string view.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for OptionValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Bytes> for OptionValue {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for OptionValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

/// Socket option map.
///
/// # Examples
///
/// ```
/// use flowsock_core::options::{SocketOption, SocketOptions};
///
/// let mut opts = SocketOptions::new().with_send_hwm(10);
/// opts.set_by_name("ZMQ_ROUTER_MANDATORY", 1).unwrap();
///
/// assert_eq!(opts.send_hwm(), 10);
/// assert!(opts.router_mandatory());
/// assert_eq!(opts.recv_hwm(), 1000);
/// assert!(opts.get(SocketOption::Linger).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SocketOptions {
    values: HashMap<SocketOption, OptionValue>,
}

impl SocketOptions {
    /// Create an empty map; typed accessors fall back to defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value of `key`, if it was ever set.
    #[must_use]
    pub fn get(&self, key: SocketOption) -> Option<&OptionValue> {
        self.values.get(&key)
    }

    /// Store `value` under `key` after checking its shape.
    ///
    /// Write-only keys (`subscribe`, `unsubscribe`) are validated but not
    /// stored.
    ///
    /// # Errors
    ///
    /// See [`SocketOption::coerce`].
    pub fn set(&mut self, key: SocketOption, value: impl Into<OptionValue>) -> Result<()> {
        let value = key.coerce(value.into())?;
        if !key.is_write_only() {
            self.values.insert(key, value);
        }
        Ok(())
    }

    /// [`set`](Self::set) by option name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOption`] for unrecognised names, then as `set`.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<()> {
        self.set(name.parse()?, value)
    }

    /// Iterate over stored entries.
    pub fn iter(&self) -> impl Iterator<Item = (SocketOption, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    fn int_or(&self, key: SocketOption, default: i64) -> i64 {
        self.get(key).and_then(OptionValue::as_int).unwrap_or(default)
    }

    fn bool_or(&self, key: SocketOption, default: bool) -> bool {
        self.get(key).and_then(OptionValue::as_bool).unwrap_or(default)
    }

    /// Send high water mark; 0 means unlimited.
    #[must_use]
    pub fn send_hwm(&self) -> usize {
        usize::try_from(self.int_or(SocketOption::SndHwm, DEFAULT_HWM as i64)).unwrap_or(0)
    }

    /// Receive high water mark; 0 means unlimited.
    #[must_use]
    pub fn recv_hwm(&self) -> usize {
        usize::try_from(self.int_or(SocketOption::RcvHwm, DEFAULT_HWM as i64)).unwrap_or(0)
    }

    /// Linger in ms, -1 for infinite.
    #[must_use]
    pub fn linger(&self) -> i64 {
        self.int_or(SocketOption::Linger, -1)
    }

    /// Maximum inbound message size; `None` when unlimited.
    #[must_use]
    pub fn max_msg_size(&self) -> Option<usize> {
        usize::try_from(self.int_or(SocketOption::MaxMsgSize, -1)).ok()
    }

    /// Whether unroutable ROUTER sends are errors.
    #[must_use]
    pub fn router_mandatory(&self) -> bool {
        self.bool_or(SocketOption::RouterMandatory, false)
    }

    /// Explicit routing identity.
    #[must_use]
    pub fn routing_id(&self) -> Option<&Bytes> {
        self.get(SocketOption::RoutingId).and_then(OptionValue::as_bytes)
    }

    /// Set send high water mark.
    #[must_use]
    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.values.insert(SocketOption::SndHwm, OptionValue::from(hwm));
        self
    }

    /// Set receive high water mark.
    #[must_use]
    pub fn with_recv_hwm(mut self, hwm: usize) -> Self {
        self.values.insert(SocketOption::RcvHwm, OptionValue::from(hwm));
        self
    }

    /// Set linger in ms.
    #[must_use]
    pub fn with_linger(mut self, linger_ms: i64) -> Self {
        self.values.insert(SocketOption::Linger, OptionValue::Int(linger_ms));
        self
    }

    /// Set the inbound message size limit.
    #[must_use]
    pub fn with_max_msg_size(mut self, size: Option<usize>) -> Self {
        let v = size.map_or(OptionValue::Int(-1), OptionValue::from);
        self.values.insert(SocketOption::MaxMsgSize, v);
        self
    }

    /// Set ROUTER mandatory mode.
    #[must_use]
    pub fn with_router_mandatory(mut self, enabled: bool) -> Self {
        self.values
            .insert(SocketOption::RouterMandatory, OptionValue::Bool(enabled));
        self
    }

    /// Set the routing identity.
    #[must_use]
    pub fn with_routing_id(mut self, id: impl Into<Bytes>) -> Self {
        self.values
            .insert(SocketOption::RoutingId, OptionValue::Bytes(id.into()));
        self
    }
}
