//! Scripted command/reply driver for line-oriented TCP consoles.
//!
//! consolewire connects to a console that ends every reply with a prompt,
//! sends commands one at a time, and pulls JSON out of the replies.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect and listen
//! - [`frame`]: sentinel-delimited reply framing and command writing
//! - [`json`]: locating and parsing JSON embedded in reply text
//! - [`session`]: scripted sessions and a stub console (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use consolewire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use consolewire_frame::*;
}

/// Re-export JSON extraction types.
pub mod json {
    pub use consolewire_json::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use consolewire_session::*;
}
