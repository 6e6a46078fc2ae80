//! Agent protocol errors.

use std::{io, string::FromUtf8Error};

use thiserror::Error;

/// Wire-level protocol errors.
///
/// Every variant of this type means the byte stream to the agent can no
/// longer be trusted, so a client that hits one discards its connection.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Received string was not UTF-8 encoded.
    #[error("String encoding failed: {0}")]
    StringEncoding(#[from] FromUtf8Error),

    /// Input/output error.
    #[error("I/O Error: {0}")]
    IO(#[from] io::Error),

    /// Error decoding SSH structures.
    #[error("SSH encoding error: {0}")]
    SshEncoding(#[from] ssh_encoding::Error),

    /// SSH key format error.
    #[error("SSH key error: {0}")]
    SshKey(#[from] ssh_key::Error),

    /// Received command was not supported.
    #[error("Command not supported ({command})")]
    UnsupportedCommand {
        /// Command code that was unsupported.
        command: u8,
    },

    /// The agent answered with a message that does not belong to the request.
    #[error("Unexpected response {actual} to request {expected}")]
    UnexpectedResponse {
        /// Message number of the request that was sent.
        expected: u8,
        /// Message number of the response that arrived.
        actual: u8,
    },

    /// A frame declared a length of zero, leaving no room for the type byte.
    #[error("Frame is too short to carry a message type")]
    FrameTooShort,

    /// A frame declared a length over the configured maximum.
    #[error("Frame of {length} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge {
        /// Declared (or encoded) length of the frame.
        length: usize,
        /// Configured maximum frame length.
        max: usize,
    },

    /// A message did not use up its whole frame.
    #[error("{remaining} bytes left over after the message")]
    TrailingData {
        /// Bytes left after decoding.
        remaining: usize,
    },

    /// A request was issued while the response to a previous one is still unread.
    #[error("Request {outstanding} is still awaiting its response")]
    RequestOutstanding {
        /// Message number of the request still awaiting a response.
        outstanding: u8,
    },

    /// A response was read without any request in flight.
    #[error("No request is awaiting a response")]
    NothingOutstanding,

    /// Extension response contents do not match the registered shape.
    #[error("Malformed contents for extension {name:?}")]
    InvalidExtensionPayload {
        /// Name of the extension.
        name: String,
    },
}

/// Protocol result.
pub type ProtoResult<T> = Result<T, ProtoError>;
