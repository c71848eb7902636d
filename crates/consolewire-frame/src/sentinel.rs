//! Prompt sentinels.
//!
//! The console prints `"\n<port>: "` as its prompt, so the default sentinel
//! is the port number followed by a colon and a space.

use std::fmt;

use bytes::Bytes;
use consolewire_transport::DEFAULT_PORT;

use crate::error::{FrameError, Result};

/// Sentinel used by consoles listening on the default port.
pub const DEFAULT_SENTINEL: &str = "10240: ";

/// Immutable byte pattern that marks the end of a reply.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sentinel(Bytes);

impl Sentinel {
    /// Create a sentinel from an arbitrary non-empty pattern.
    pub fn new(pattern: impl Into<Bytes>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(FrameError::EmptySentinel);
        }
        Ok(Self(pattern))
    }

    /// The prompt a console listening on `port` prints.
    pub fn for_port(port: u16) -> Self {
        Self(Bytes::from(format!("{port}: ")))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The pattern as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::for_port(DEFAULT_PORT)
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sentinel({self})")
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}
