//! Negative answer from the agent.

use ssh_encoding::{self, Decode, Encode, Reader, Writer};

use crate::proto::{Error, Result};

/// Body of an `SSH_AGENT_FAILURE` or `SSH_AGENT_EXTENSION_FAILURE` message.
///
/// The protocol defines no payload for these messages. Some agents append
/// a human-readable reason as an SSH `string`; it is kept when present.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Failure {
    /// Reason reported by the agent, if any.
    pub reason: Option<String>,
}

impl Failure {
    /// Failure carrying a reason.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl Decode for Failure {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let reason = if reader.is_finished() {
            None
        } else {
            Some(String::decode(reader)?)
        };

        Ok(Self { reason })
    }
}

impl Encode for Failure {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        match &self.reason {
            Some(reason) => reason.encoded_len(),
            None => Ok(0),
        }
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        if let Some(reason) = &self.reason {
            reason.encode(writer)?;
        }
        Ok(())
    }
}
