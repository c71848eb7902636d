/// Errors that can occur in console transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved to any socket address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the console.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to bind a listening socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
