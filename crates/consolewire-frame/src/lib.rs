//! Sentinel-terminated reply framing for line-oriented consoles.
//!
//! A console answers each command with free-form text and then prints its
//! next prompt. The prompt text (the *sentinel*, e.g. `"10240: "`) is the
//! only frame boundary on the wire:
//!
//! ```text
//! <reply bytes ...><sentinel><reply bytes ...><sentinel>
//! ```
//!
//! [`FrameReader`] turns a chunked byte stream into one [`Reply`] per call,
//! tolerating sentinels split across reads and peers that hang up.
//! [`CommandWriter`] sends command lines and flattened file payloads.

pub mod codec;
pub mod error;
pub mod reader;
pub mod sentinel;
pub mod writer;

pub use codec::{
    find_sentinel, scan_start, FrameConfig, Reply, DEFAULT_MAX_REPLY, READ_CHUNK_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use sentinel::{Sentinel, DEFAULT_SENTINEL};
pub use writer::CommandWriter;
