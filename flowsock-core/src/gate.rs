//! Readiness edges and the re-entrancy gate around the drain loops.
//!
//! Every path into a drain loop (readiness edge, explicit send, resume, bind
//! completion) goes through [`ReadinessGate::enter`]. Entry is refused while
//! the socket is paused or closed, or while a drain in the same direction is
//! already running further up the call stack. Admission hands back a
//! [`DrainGuard`] that clears the in-progress flag when dropped, so the flag
//! is released on every exit path, including `?` returns.

use std::cell::Cell;
use std::fmt;

/// Readiness reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    /// A frame can be received without blocking.
    pub readable: bool,
    /// A frame can be sent without blocking.
    pub writable: bool,
}

impl Readiness {
    /// Nothing ready.
    pub const NONE: Self = Self {
        readable: false,
        writable: false,
    };
    /// Read side only.
    pub const READABLE: Self = Self {
        readable: true,
        writable: false,
    };
    /// Write side only.
    pub const WRITABLE: Self = Self {
        readable: false,
        writable: true,
    };
    /// Both sides.
    pub const BOTH: Self = Self {
        readable: true,
        writable: true,
    };

    /// Whether either side is ready.
    #[must_use]
    pub const fn any(self) -> bool {
        self.readable || self.writable
    }
}

/// Which drain loop is being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Receive drain.
    Read,
    /// Send drain.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Per-socket pause state and in-progress guards.
///
/// Single-threaded by construction: the flags are `Cell`s and the gate is
/// owned by exactly one socket.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    paused: Cell<bool>,
    closed: Cell<bool>,
    flushing_reads: Cell<bool>,
    flushing_writes: Cell<bool>,
    read_deferred: Cell<bool>,
    edges: Cell<u64>,
}

impl ReadinessGate {
    /// Create an open, unpaused gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a drain in `direction`.
    ///
    /// Returns `None` when paused, closed, or already draining that way.
    #[must_use]
    pub fn enter(&self, direction: Direction) -> Option<DrainGuard<'_>> {
        if self.paused.get() || self.closed.get() {
            return None;
        }

        let flag = self.flag(direction);
        if flag.get() {
            return None;
        }

        flag.set(true);
        Some(DrainGuard { flag })
    }

    /// Whether a drain in `direction` is currently running.
    #[must_use]
    pub fn is_draining(&self, direction: Direction) -> bool {
        self.flag(direction).get()
    }

    /// Stop both drain loops until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.set(true);
    }

    /// Allow drain loops again.
    pub fn resume(&self) {
        self.paused.set(false);
    }

    /// Whether the socket is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Permanently refuse every drain.
    pub fn close(&self) {
        self.closed.set(true);
    }

    /// Whether the socket was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Count a readiness edge delivered to the socket.
    pub fn record_edge(&self) {
        self.edges.set(self.edges.get().wrapping_add(1));
    }

    /// Number of readiness edges delivered so far.
    #[must_use]
    pub fn edges_seen(&self) -> u64 {
        self.edges.get()
    }

    /// Note that a receive drain stopped early on a failure and input may be
    /// left behind with no edge coming for it.
    pub fn defer_read(&self) {
        self.read_deferred.set(true);
    }

    /// Clear and return the deferred read note.
    pub fn take_deferred_read(&self) -> bool {
        self.read_deferred.replace(false)
    }

    fn flag(&self, direction: Direction) -> &Cell<bool> {
        match direction {
            Direction::Read => &self.flushing_reads,
            Direction::Write => &self.flushing_writes,
        }
    }
}

/// RAII admission ticket for one drain loop run.
///
/// The in-progress flag stays set for as long as the guard lives.
#[must_use = "dropping the guard immediately ends the drain"]
pub struct DrainGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
