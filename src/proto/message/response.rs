//! SSH agent protocol response messages.
use ssh_encoding::{CheckedSum, Decode, Encode, Reader, Writer};

use super::{Extension, Failure, Identity, SignatureBlob, Unparsed};
use crate::proto::{Error, ResponseCode, Result};

/// SSH agent protocol response messages.
///
/// These message types are sent to a client *from* an agent (in response to a [`Request`](super::Request) message).
///
/// Described in [draft-miller-ssh-agent-14 § 3](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3).
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Response {
    /// Indicates generic agent failure
    Failure(Failure),

    /// Indicates generic agent success.
    ///
    /// Extension replies may append contents after the message number.
    Success(Unparsed),

    /// A list of identities, sent in response to
    /// a [`Request::RequestIdentities`](super::Request::RequestIdentities) message.
    IdentitiesAnswer(Vec<Identity>),

    /// A signature, sent in response to
    /// a [`Request::SignRequest`](super::Request::SignRequest) message.
    SignResponse(SignatureBlob),

    /// Indicates that a supported extension failed
    ExtensionFailure(Failure),

    /// Send a vendor-specific response message via the agent protocol,
    /// identified by an *extension type*.
    ExtensionResponse(Extension),
}

impl Response {
    /// The protocol message identifier for a given [`Response`] message type.
    ///
    /// Described in [draft-miller-ssh-agent-14 § 6.1](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-6.1).
    pub fn message_id(&self) -> u8 {
        self.code().to_u8()
    }

    /// The [`ResponseCode`] of this response.
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::Failure(_) => ResponseCode::Failure,
            Self::Success(_) => ResponseCode::Success,
            Self::IdentitiesAnswer(_) => ResponseCode::IdentitiesAnswer,
            Self::SignResponse(_) => ResponseCode::SignResponse,
            Self::ExtensionFailure(_) => ResponseCode::ExtensionFailure,
            Self::ExtensionResponse(_) => ResponseCode::ExtensionResponse,
        }
    }

    /// Decode the payload that follows the message number.
    pub fn decode_payload(message_id: u8, reader: &mut impl Reader) -> Result<Self> {
        match ResponseCode::from_u8(message_id)? {
            ResponseCode::Failure => Failure::decode(reader).map(Self::Failure),
            ResponseCode::Success => Unparsed::decode(reader).map(Self::Success),
            ResponseCode::IdentitiesAnswer => {
                Identity::decode_vec(reader).map(Self::IdentitiesAnswer)
            }
            ResponseCode::SignResponse => SignatureBlob::decode(reader).map(Self::SignResponse),
            ResponseCode::ExtensionFailure => Failure::decode(reader).map(Self::ExtensionFailure),
            ResponseCode::ExtensionResponse => {
                Extension::decode(reader).map(Self::ExtensionResponse)
            }
        }
    }
}

impl Decode for Response {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let message_type = u8::decode(reader)?;
        Self::decode_payload(message_type, reader)
    }
}

impl Encode for Response {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        let message_id_len = 1;
        let payload_len = match self {
            Self::Failure(failure) => failure.encoded_len()?,
            Self::Success(details) => details.encoded_len()?,
            Self::IdentitiesAnswer(ids) => Identity::encoded_len_vec(ids)?,
            Self::SignResponse(signature) => signature.encoded_len()?,
            Self::ExtensionFailure(failure) => failure.encoded_len()?,
            Self::ExtensionResponse(extension) => extension.encoded_len()?,
        };

        [message_id_len, payload_len].checked_sum()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        let message_id: u8 = self.message_id();
        message_id.encode(writer)?;

        match self {
            Self::Failure(failure) => failure.encode(writer)?,
            Self::Success(details) => details.encode(writer)?,
            Self::IdentitiesAnswer(ids) => Identity::encode_vec(ids, writer)?,
            Self::SignResponse(signature) => signature.encode(writer)?,
            Self::ExtensionFailure(failure) => failure.encode(writer)?,
            Self::ExtensionResponse(extension) => extension.encode(writer)?,
        };

        Ok(())
    }
}
