use std::io::{ErrorKind, Read};
use std::time::Instant;

use bytes::BytesMut;
use consolewire_transport::ConsoleStream;
use tracing::{debug, trace, warn};

use crate::codec::{find_sentinel, scan_start, FrameConfig, Reply, READ_CHUNK_SIZE};
use crate::error::{FrameError, Result};
use crate::sentinel::Sentinel;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Reads sentinel-terminated replies from any `Read` stream.
///
/// Each call to [`read_reply`](Self::read_reply) consumes exactly one frame
/// and starts from an empty buffer. Bytes that arrive after the sentinel in
/// the same read are discarded.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    sentinel: Sentinel,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T, sentinel: Sentinel) -> Self {
        Self::with_config(inner, sentinel, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, sentinel: Sentinel, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            sentinel,
            config,
        }
    }

    /// Read the next reply (blocking).
    ///
    /// Returns a complete reply once the sentinel is seen, or a partial one
    /// (`complete == false`) if the peer closes the connection first. A read
    /// deadline that expires yields [`FrameError::NoResponse`].
    pub fn read_reply(&mut self) -> Result<Reply> {
        self.buf.clear();
        let started = Instant::now();
        let needle_len = self.sentinel.as_bytes().len();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_deadline(&err) => {
                    return Err(FrameError::NoResponse {
                        waited: started.elapsed(),
                        partial: self.buf.len(),
                    });
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                warn!(partial = self.buf.len(), "connection dropped");
                return Ok(Reply::dropped(self.buf.split().freeze()));
            }

            let from = scan_start(self.buf.len(), needle_len);
            self.buf.extend_from_slice(&chunk[..read]);
            trace!(read, buffered = self.buf.len(), from, "scanning for sentinel");

            if let Some(at) = find_sentinel(&self.buf, self.sentinel.as_bytes(), from) {
                let trailing = self.buf.len() - at - needle_len;
                if trailing > 0 {
                    debug!(trailing, "discarding bytes after sentinel");
                }
                self.buf.truncate(at);
                return Ok(Reply::complete(self.buf.split().freeze()));
            }

            if self.buf.len() > self.config.max_reply_size {
                return Err(FrameError::ReplyTooLarge {
                    size: self.buf.len(),
                    max: self.config.max_reply_size,
                });
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

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// The sentinel this reader splits on.
    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<ConsoleStream> {
    /// Create a frame reader for a `ConsoleStream` and apply the read
    /// deadline from config.
    pub fn with_config_console(
        inner: ConsoleStream,
        sentinel: Sentinel,
        config: FrameConfig,
    ) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, sentinel, config))
    }
}

// Blocking sockets report an expired SO_RCVTIMEO as WouldBlock on Unix and
// TimedOut on Windows.
fn is_deadline(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

pub(crate) fn transport_to_frame_error(err: consolewire_transport::TransportError) -> FrameError {
    match err {
        consolewire_transport::TransportError::Io(io)
        | consolewire_transport::TransportError::Accept(io) => FrameError::Io(io),
        consolewire_transport::TransportError::Bind { source, .. }
        | consolewire_transport::TransportError::Connect { source, .. }
        | consolewire_transport::TransportError::Resolve { source, .. } => FrameError::Io(source),
    }
}
