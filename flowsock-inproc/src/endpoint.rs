//! Endpoint parsing.
//!
//! Only `inproc://name` addresses are served. The other schemes of the
//! messaging layer are recognised so they can be rejected with a clear error
//! instead of a generic parse failure.

use std::fmt;
use std::str::FromStr;

use flowsock_core::error::{Error, Result};

const INPROC: &str = "inproc://";
const FOREIGN_SCHEMES: [&str; 5] = ["tcp://", "ipc://", "pgm://", "epgm://", "vmci://"];

/// A parsed in-process endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InprocEndpoint {
    name: String,
}

impl InprocEndpoint {
    /// Parse `inproc://name`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEndpoint`] for another scheme, a missing scheme or an
    /// empty name.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowsock_inproc::endpoint::InprocEndpoint;
    ///
    /// let ep = InprocEndpoint::parse("inproc://workers").unwrap();
    /// assert_eq!(ep.name(), "workers");
    /// assert!(InprocEndpoint::parse("tcp://127.0.0.1:5555").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// Name without the scheme.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for InprocEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(name) = s.strip_prefix(INPROC) {
            if name.is_empty() {
                return Err(Error::InvalidEndpoint(format!(
                    "{s}: inproc name cannot be empty"
                )));
            }
            return Ok(Self {
                name: name.to_string(),
            });
        }

        if FOREIGN_SCHEMES.iter().any(|scheme| s.starts_with(scheme)) {
            Err(Error::InvalidEndpoint(format!(
                "{s}: transport not available, only inproc:// is served"
            )))
        } else {
            Err(Error::InvalidEndpoint(format!("{s}: missing or unknown scheme")))
        }
    }
}

impl fmt::Display for InprocEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INPROC}{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inproc() {
        let ep: InprocEndpoint = "inproc://test".parse().unwrap();
        assert_eq!(ep.name(), "test");
        assert_eq!(ep.to_string(), "inproc://test");
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        for bad in ["inproc://", "", "test", "tcp://127.0.0.1:5555", "ipc:///tmp/x"] {
            assert!(
                matches!(InprocEndpoint::parse(bad), Err(Error::InvalidEndpoint(_))),
                "{bad} should be rejected"
            );
        }
    }
}
