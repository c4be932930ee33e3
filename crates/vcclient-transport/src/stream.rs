use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::addr::ServerAddr;
use crate::error::{Result, TransportError};

/// A connected server stream. Implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by transport operations. It
/// remembers the address it was opened against so that errors and logs can
/// name the server.
pub struct ServerStream {
    inner: TcpStream,
    addr: ServerAddr,
}

impl Read for ServerStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ServerStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl ServerStream {
    /// Connect to `addr`, bounding the TCP connect by `timeout` when given.
    ///
    /// No read or write timeout is applied to the returned stream.
    pub fn connect(addr: &ServerAddr, timeout: Option<Duration>) -> Result<Self> {
        let socket_addr = addr.resolve()?;
        let inner = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
            None => TcpStream::connect(socket_addr),
        }
        .map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;
        inner.set_nodelay(true)?;
        debug!(server = %addr, "tcp stream connected");
        Ok(Self {
            inner,
            addr: addr.clone(),
        })
    }

    /// Address this stream was opened against.
    pub fn addr(&self) -> &ServerAddr {
        &self.addr
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_clone()?,
            addr: self.addr.clone(),
        })
    }

    /// Obtain a handle that can shut this socket down from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            inner: self.inner.try_clone()?,
        })
    }
}

impl std::fmt::Debug for ServerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerStream")
            .field("addr", &self.addr)
            .finish()
    }
}

/// Shuts down both directions of a socket owned elsewhere.
///
/// A thread blocked in `read` on the same socket observes EOF or an error as
/// soon as `shutdown` returns.
pub struct ShutdownHandle {
    inner: TcpStream,
}

impl ShutdownHandle {
    /// Shut down both halves. Already-closed sockets are not an error.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle").finish_non_exhaustive()
    }
}
