//! Errors returned by agent clients.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::proto::{Failure, ProtoError};

/// Why a connection to the agent could not be established.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The agent socket environment variable is missing or empty.
    #[error("{0} is not set")]
    SocketUnset(&'static str),

    /// Connecting to the agent socket failed.
    #[error("Cannot connect to {}: {source}", path.display())]
    Connect {
        /// Socket the client tried to reach.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },

    /// The requested transport is not available on this platform.
    #[error("Unsupported agent address: {0}")]
    Unsupported(String),
}

/// Why an extension could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Unsupported {
    /// The client has no registry entry for the name.
    #[error("not registered with the client")]
    NotRegistered,

    /// The agent did not list the name in its `query` reply.
    #[error("not advertised by the agent")]
    NotAdvertised,

    /// The agent answered the extension request with `SSH_AGENT_FAILURE`.
    #[error("rejected by the agent")]
    Rejected,
}

/// Errors returned by agent clients.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The connection could not be established.
    #[error("Agent: Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The transport failed mid-session.
    #[error("Agent: I/O error: {0}")]
    IO(#[from] io::Error),

    /// The agent closed the stream, or the client was shut down.
    #[error("Agent: Connection closed")]
    ConnectionClosed,

    /// Malformed frame, unexpected message or a second request in flight.
    #[error("Agent: Protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// The agent answered a well-formed request with a failure.
    #[error("Agent: Request failed: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Failure {
        /// Reason reported by the agent, if any.
        reason: Option<String>,
    },

    /// The extension cannot be used with this agent.
    #[error("Agent: Extension {name:?} is {cause}")]
    UnsupportedExtension {
        /// Name of the extension.
        name: String,
        /// Which check failed.
        cause: Unsupported,
    },

    /// The client was invalidated by an earlier fatal error.
    #[error("Agent: Connection is unusable after an earlier fault")]
    Faulted,
}

impl AgentError {
    /// Whether this error leaves the connection unusable.
    ///
    /// Fatal errors mean the framing state of the stream is unknown; the
    /// client has to be dropped and a new one connected.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IO(_) | Self::ConnectionClosed | Self::Proto(_) | Self::Faulted
        )
    }

    pub(crate) fn unsupported(name: impl Into<String>, cause: Unsupported) -> Self {
        Self::UnsupportedExtension {
            name: name.into(),
            cause,
        }
    }
}

impl From<Failure> for AgentError {
    fn from(failure: Failure) -> Self {
        Self::Failure {
            reason: failure.reason,
        }
    }
}
