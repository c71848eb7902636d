//! Blocking TCP transport for line-oriented command consoles.
//!
//! This is the lowest layer of consolewire. It knows nothing about prompts
//! or replies; it hands out a connected [`ConsoleStream`] and, for test
//! consoles, a [`ConsoleListener`] that accepts them.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::ConsoleStream;
pub use tcp::{connect, ConsoleAddr, ConsoleListener, DEFAULT_HOST, DEFAULT_PORT};
