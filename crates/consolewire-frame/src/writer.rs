use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use consolewire_transport::ConsoleStream;
use tracing::trace;

use crate::codec::{FrameConfig, READ_CHUNK_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const LINE_TERMINATOR: &[u8] = b"\n";

/// Bytes removed from file payloads so the whole document fits on one line.
const FLATTENED_BYTES: [u8; 3] = [b'\r', b'\n', b'\t'];

/// Writes command lines to any `Write` stream.
pub struct CommandWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> CommandWriter<T> {
    /// Create a new command writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new command writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
        }
    }

    /// Send one command line (blocking).
    ///
    /// Trailing whitespace is stripped. The `\n` terminator goes out as a
    /// separate write after the command text.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let command = command.trim_end();
        self.write_all(command.as_bytes())?;
        self.write_all(LINE_TERMINATOR)?;
        trace!(len = command.len(), "sent command");
        self.flush()
    }

    /// Stream `source` as a single line (blocking).
    ///
    /// `\r`, `\n` and `\t` are dropped in transit and one `\n` is written once
    /// the source is exhausted. Returns the number of payload bytes sent,
    /// excluding the terminator.
    pub fn send_flattened<R: Read>(&mut self, mut source: R) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut sent = 0usize;

        loop {
            let read = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            buf.extend(
                chunk[..read]
                    .iter()
                    .copied()
                    .filter(|b| !FLATTENED_BYTES.contains(b)),
            );
            let result = self.write_all(&buf);
            sent += buf.len();
            self.buf = buf;
            result?;
        }

        self.write_all(LINE_TERMINATOR)?;
        trace!(sent, "sent flattened payload");
        self.flush()?;
        Ok(sent)
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            match self.inner.write(bytes) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => bytes = &bytes[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current command writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl CommandWriter<ConsoleStream> {
    /// Create a command writer for a `ConsoleStream` and apply write timeout
    /// from config.
    pub fn with_config_console(inner: ConsoleStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
