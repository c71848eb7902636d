use bytes::Bytes;

use crate::error::Result;

/// Maximum bytes pulled from the stream per read call.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Default maximum reply size: 16 MiB.
pub const DEFAULT_MAX_REPLY: usize = 16 * 1024 * 1024;

/// One reply read from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Bytes preceding the sentinel (or everything received before a drop).
    pub payload: Bytes,
    /// `false` when the peer closed the connection before the sentinel.
    pub complete: bool,
}

impl Reply {
    /// A reply terminated by the sentinel.
    pub fn complete(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            complete: true,
        }
    }

    /// A partial reply cut short by the peer closing the connection.
    pub fn dropped(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            complete: false,
        }
    }

    /// Decode the payload as UTF-8.
    ///
    /// Invalid sequences are an error; nothing is replaced.
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.payload)?)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Offset from which to scan for the sentinel after appending a chunk to a
/// buffer that previously held `prev_len` bytes.
///
/// Every match starting before this offset was already ruled out by the
/// previous scan, so only the last `sentinel_len - 1` old bytes are
/// revisited. That overlap is what catches a sentinel split across two
/// reads. The returned offset never exceeds `new_len - sentinel_len` for
/// any non-empty append, so a sentinel at the very end is always seen.
pub fn scan_start(prev_len: usize, sentinel_len: usize) -> usize {
    prev_len.saturating_sub(sentinel_len.saturating_sub(1))
}

/// Find the first occurrence of `needle` in `haystack` at or after `from`.
pub fn find_sentinel(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Configuration for the frame reader and command writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum reply size in bytes. Default: 16 MiB.
    pub max_reply_size: usize,
    /// Read deadline. `None` blocks until the sentinel or a peer close.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_reply_size: DEFAULT_MAX_REPLY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
