use consolewire_frame::{CommandWriter, FrameReader};
use consolewire_transport::{ConsoleAddr, ConsoleStream};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// A session over a TCP console connection.
pub type ConsoleSession = Session<ConsoleStream, ConsoleStream>;

/// Connect to a console and apply the configured deadlines.
///
/// The console's greeting is left unread; call
/// [`Session::read_banner`] before the first request.
pub fn connect(addr: &ConsoleAddr, config: SessionConfig) -> Result<ConsoleSession> {
    let stream = consolewire_transport::connect(addr, config.connect_timeout)?;
    stream.set_nodelay(true)?;
    let reader_stream = stream.try_clone()?;

    let reader = FrameReader::with_config_console(
        reader_stream,
        config.sentinel.clone(),
        config.frame.clone(),
    )?;
    let writer = CommandWriter::with_config_console(stream, config.frame.clone())?;

    info!(%addr, sentinel = %config.sentinel, "console session opened");
    Ok(Session::from_parts(reader, writer, config))
}
