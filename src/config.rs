//! Where to find the agent and how much to accept from it.

use std::{ffi::OsString, path::PathBuf};

use service_binding::Binding;

use crate::{error::ConnectionError, frame::MAX_FRAME_LEN};

/// Environment variable holding the agent socket path.
pub const SSH_AUTH_SOCK: &str = "SSH_AUTH_SOCK";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Path of the agent's Unix socket.
    pub socket: PathBuf,

    /// Largest frame accepted from or sent to the agent.
    pub max_frame_len: usize,
}

impl ClientConfig {
    /// Configuration for the agent listening on `socket`.
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Read the socket path from [`SSH_AUTH_SOCK`].
    pub fn from_env() -> Result<Self, ConnectionError> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Read the socket path through `lookup` instead of the process environment.
    pub fn from_lookup(
        lookup: impl FnOnce(&str) -> Option<OsString>,
    ) -> Result<Self, ConnectionError> {
        match lookup(SSH_AUTH_SOCK) {
            Some(path) if !path.is_empty() => Ok(Self::new(path)),
            _ => Err(ConnectionError::SocketUnset(SSH_AUTH_SOCK)),
        }
    }

    /// Override the maximum frame length.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// The socket as a [`Binding`], for the async [`connect`](crate::client::connect).
    pub fn binding(&self) -> Binding {
        Binding::FilePath(self.socket.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_comes_from_lookup() -> Result<(), ConnectionError> {
        let config = ClientConfig::from_lookup(|key| {
            assert_eq!(key, SSH_AUTH_SOCK);
            Some("/run/agent.sock".into())
        })?;
        assert_eq!(config.socket, PathBuf::from("/run/agent.sock"));
        assert_eq!(config.max_frame_len, MAX_FRAME_LEN);
        Ok(())
    }

    #[test]
    fn missing_or_empty_socket_is_rejected() {
        assert!(matches!(
            ClientConfig::from_lookup(|_| None),
            Err(ConnectionError::SocketUnset(SSH_AUTH_SOCK))
        ));
        assert!(matches!(
            ClientConfig::from_lookup(|_| Some(OsString::new())),
            Err(ConnectionError::SocketUnset(_))
        ));
    }
}
