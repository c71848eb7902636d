use std::fmt;
use std::io;

use consolewire_frame::FrameError;
use consolewire_json::JsonError;
use consolewire_session::SessionError;
use consolewire_transport::TransportError;

// Exit codes follow sysexits-style conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotFound
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Resolve { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::NoResponse { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::ReplyTooLarge { .. } | FrameError::Decode(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::EmptySentinel => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn json_error(context: &str, err: JsonError) -> CliError {
    match err {
        JsonError::Reply(err) => frame_error(context, err),
        JsonError::Malformed(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Json(err) => json_error(context, err),
        SessionError::File { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        SessionError::Io(source) => io_error(context, source),
        SessionError::OutOfSync { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
    }
}
