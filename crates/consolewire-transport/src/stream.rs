use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected console stream implementing Read and Write.
///
/// This is the fundamental I/O type returned by transport operations. It
/// wraps a TCP stream; the frame layer reads replies from one handle and
/// writes commands through a clone of it.
pub struct ConsoleStream {
    inner: TcpStream,
}

impl Read for ConsoleStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ConsoleStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl ConsoleStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self { inner: stream }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// `None` blocks until data arrives or the peer closes.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Disable Nagle's algorithm so each command line goes out immediately.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_tcp(cloned))
    }

    /// Address of the remote console.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Local address of this connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Shut down both halves of the connection.
    ///
    /// Clones share the socket, so this also ends reads on a cloned reader.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for ConsoleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("ConsoleStream");
        dbg.field("type", &"tcp");
        if let Ok(peer) = self.inner.peer_addr() {
            dbg.field("peer", &peer);
        }
        dbg.finish()
    }
}
