//! SSH agent protocol request messages.

use ssh_encoding::{CheckedSum, Decode, Encode, Reader, Writer};

use super::{Extension, SignRequest};
use crate::proto::{Error, RequestCode, Result};

/// SSH agent protocol request messages.
///
/// These message types are sent from a client *to* an agent.
///
/// Described in [draft-miller-ssh-agent-14 § 3](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3).
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Request {
    /// Request a list of all identities (public key & comment)
    /// from an agent
    RequestIdentities,

    /// Perform a private key signature operation using a key
    /// stored in the agent
    SignRequest(SignRequest),

    /// Send a vendor-specific message via the agent protocol,
    /// identified by an *extension type*.
    Extension(Extension),
}

impl Request {
    /// The protocol message identifier for a given [`Request`] message type.
    ///
    /// Described in [draft-miller-ssh-agent-14 § 6.1](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-6.1).
    pub fn message_id(&self) -> u8 {
        self.code().to_u8()
    }

    /// The [`RequestCode`] of this request.
    pub fn code(&self) -> RequestCode {
        match self {
            Self::RequestIdentities => RequestCode::RequestIdentities,
            Self::SignRequest(_) => RequestCode::SignRequest,
            Self::Extension(_) => RequestCode::Extension,
        }
    }
}

impl Decode for Request {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let message_type = u8::decode(reader)?;

        match RequestCode::from_u8(message_type)? {
            RequestCode::RequestIdentities => Ok(Self::RequestIdentities),
            RequestCode::SignRequest => SignRequest::decode(reader).map(Self::SignRequest),
            RequestCode::Extension => Extension::decode(reader).map(Self::Extension),
        }
    }
}

impl Encode for Request {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        let message_id_len = 1;
        let payload_len = match self {
            Self::RequestIdentities => 0,
            Self::SignRequest(request) => request.encoded_len()?,
            Self::Extension(extension) => extension.encoded_len()?,
        };

        [message_id_len, payload_len].checked_sum()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        let message_id: u8 = self.message_id();
        message_id.encode(writer)?;

        match self {
            Self::RequestIdentities => {}
            Self::SignRequest(request) => request.encode(writer)?,
            Self::Extension(extension) => extension.encode(writer)?,
        };

        Ok(())
    }
}
