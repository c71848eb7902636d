use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::ConsoleStream;

/// Default console host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default console port. The console also uses it as its prompt text.
pub const DEFAULT_PORT: u16 = 10240;

/// Host and port of a remote console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleAddr {
    pub host: String,
    pub port: u16,
}

impl ConsoleAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: self.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Resolve {
                addr: self.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses for host"),
            });
        }
        Ok(addrs)
    }
}

impl Default for ConsoleAddr {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ConsoleAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for ConsoleAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Connect to a console (blocking).
///
/// Every resolved address is tried in order; the last failure is reported.
/// With `timeout` set, each attempt is bounded by it.
pub fn connect(addr: &ConsoleAddr, timeout: Option<Duration>) -> Result<ConsoleStream> {
    let mut last_err = None;

    for sock_addr in addr.resolve()? {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&sock_addr, timeout),
            None => TcpStream::connect(sock_addr),
        };
        match attempt {
            Ok(stream) => {
                debug!(%sock_addr, "connected to console");
                return Ok(ConsoleStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(%sock_addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr: addr.to_string(),
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses for host")),
    })
}

/// TCP listener for console-side endpoints.
pub struct ConsoleListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ConsoleListener {
    /// Bind and listen. Port 0 picks an ephemeral port; see [`Self::local_addr`].
    pub fn bind(addr: &ConsoleAddr) -> Result<Self> {
        let listener = TcpListener::bind((addr.host.as_str(), addr.port)).map_err(|source| {
            TransportError::Bind {
                addr: addr.to_string(),
                source,
            }
        })?;
        let local_addr = listener.local_addr().map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        info!(%local_addr, "listening for console connections");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(ConsoleStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok((ConsoleStream::from_tcp(stream), peer))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
