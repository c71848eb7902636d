use std::path::PathBuf;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] consolewire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] consolewire_frame::FrameError),

    /// Embedded JSON could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] consolewire_json::JsonError),

    /// An earlier command got no reply in time; its late reply would be
    /// read as the answer to the next one.
    #[error("session out of sync: no reply to {command:?} before the deadline")]
    OutOfSync { command: String },

    /// A payload or script file could not be read.
    #[error("failed reading {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error on the console side of a connection.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
