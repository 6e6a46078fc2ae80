//! Byte stream to the agent.
//!
//! A [`Transport`] owns exactly one connection and only moves bytes; framing
//! lives in [`frame`](crate::frame) and message handling in the clients.

use std::{
    fmt,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
#[cfg(unix)]
use std::{net::Shutdown, os::unix::net::UnixStream};

use log::info;

use crate::error::{AgentError, ConnectionError};

/// Streams that can dial an agent socket by path.
pub trait Connect: Read + Write + Sized {
    /// Open a connection to the socket at `path`.
    fn connect(path: &Path) -> io::Result<Self>;
}

#[cfg(unix)]
impl Connect for UnixStream {
    fn connect(path: &Path) -> io::Result<Self> {
        UnixStream::connect(path)
    }
}

/// Lifecycle of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected yet; the first use connects.
    Unopened,
    /// Connected.
    Open,
    /// Closed, either explicitly or after a fault. Never reopens.
    Closed,
}

type Connector<S> = fn(&Path) -> io::Result<S>;

/// One duplex connection to the agent.
pub struct Transport<S> {
    stream: Option<S>,
    state: ConnectionState,
    target: Option<(PathBuf, Connector<S>)>,
}

impl<S> fmt::Debug for Transport<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("stream", &self.stream)
            .field("state", &self.state)
            .field("socket", &self.target.as_ref().map(|(path, _)| path))
            .finish()
    }
}

impl<S: Connect> Transport<S> {
    /// Transport that connects to `socket` when first used.
    pub fn unopened(socket: impl Into<PathBuf>) -> Self {
        Self {
            stream: None,
            state: ConnectionState::Unopened,
            target: Some((socket.into(), S::connect)),
        }
    }
}

impl<S: Read + Write> Transport<S> {
    /// Transport over an already connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            state: ConnectionState::Open,
            target: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connect if not connected yet.
    ///
    /// Fails with [`AgentError::ConnectionClosed`] once the transport was closed.
    pub fn open(&mut self) -> Result<(), AgentError> {
        match self.state {
            ConnectionState::Open => Ok(()),
            ConnectionState::Closed => Err(AgentError::ConnectionClosed),
            ConnectionState::Unopened => {
                let Some((path, connect)) = &self.target else {
                    return Err(
                        ConnectionError::Unsupported("no agent socket configured".into()).into(),
                    );
                };
                let stream = connect(path).map_err(|source| ConnectionError::Connect {
                    path: path.clone(),
                    source,
                })?;
                info!("Connected to agent at {}", path.display());
                self.stream = Some(stream);
                self.state = ConnectionState::Open;
                Ok(())
            }
        }
    }

    /// Fill `buf` completely.
    ///
    /// End of stream before `buf` is full is [`AgentError::ConnectionClosed`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), AgentError> {
        self.stream()?.read_exact(buf).map_err(classify)
    }

    /// Write all of `bytes` and flush.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), AgentError> {
        let stream = self.stream()?;
        stream.write_all(bytes).map_err(classify)?;
        stream.flush().map_err(classify)
    }

    /// Release the stream. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Closed agent connection");
        }
        self.state = ConnectionState::Closed;
    }

    /// Extracts the inner stream, if still open, by consuming this object.
    pub fn into_inner(self) -> Option<S> {
        self.stream
    }

    fn stream(&mut self) -> Result<&mut S, AgentError> {
        if self.state == ConnectionState::Unopened {
            self.open()?;
        }
        self.stream.as_mut().ok_or(AgentError::ConnectionClosed)
    }
}

#[cfg(unix)]
impl Transport<UnixStream> {
    /// Handle that can shut the connection down from another thread.
    pub fn shutdown_handle(&mut self) -> Result<ShutdownHandle, AgentError> {
        Ok(ShutdownHandle(self.stream()?.try_clone()?))
    }
}

/// Closes a Unix socket connection from outside the thread using it.
///
/// A read blocked on the connection returns and the pending call fails
/// with [`AgentError::ConnectionClosed`].
#[cfg(unix)]
#[derive(Debug)]
pub struct ShutdownHandle(UnixStream);

#[cfg(unix)]
impl ShutdownHandle {
    /// Shut down both directions of the connection.
    pub fn shutdown(&self) -> io::Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// Hangups become [`AgentError::ConnectionClosed`], anything else stays I/O.
pub(crate) fn classify(error: io::Error) -> AgentError {
    match error.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => AgentError::ConnectionClosed,
        _ => AgentError::IO(error),
    }
}
