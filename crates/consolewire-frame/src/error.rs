use std::time::Duration;

/// Errors that can occur while framing replies or sending commands.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A sentinel must contain at least one byte.
    #[error("sentinel must not be empty")]
    EmptySentinel,

    /// The reply grew past the configured maximum without a sentinel.
    #[error("reply too large ({size} bytes, max {max})")]
    ReplyTooLarge { size: usize, max: usize },

    /// The read deadline expired before the sentinel arrived.
    ///
    /// Distinct from a dropped connection: the peer is still there but
    /// has not finished its reply.
    #[error("no response after {waited:?} ({partial} bytes buffered)")]
    NoResponse { waited: Duration, partial: usize },

    /// The reply payload is not valid UTF-8.
    #[error("reply is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// An I/O error occurred while reading or writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer stopped accepting bytes while a command was being written.
    #[error("connection closed (incomplete write)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
