//! Signature request with data to be signed with a key in an agent.

use ssh_encoding::{self, CheckedSum, Decode, Encode, Reader, Writer};
use ssh_key::Signature;

use super::identity::{Identity, KeyBlob};
use crate::proto::{Error, Result};

/// Request an `rsa-sha2-256` signature from an RSA key.
///
/// Described in [draft-miller-ssh-agent-14 § 3.6.1](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3.6.1)
pub const SSH_AGENT_RSA_SHA2_256: u32 = 0x02;

/// Request an `rsa-sha2-512` signature from an RSA key.
pub const SSH_AGENT_RSA_SHA2_512: u32 = 0x04;

/// Signature request with data to be signed with a key in an agent.
///
/// This structure is sent in a [`Request::SignRequest`](super::Request::SignRequest) (`SSH_AGENTC_SIGN_REQUEST`) message.
///
/// Described in [draft-miller-ssh-agent-14 § 3.6](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3.6)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignRequest {
    /// The public key portion of the [`Identity`] in the agent to sign the data with
    pub pubkey: KeyBlob,

    /// Binary data to be signed
    pub data: Vec<u8>,

    /// Signature flags, as described in
    /// [draft-miller-ssh-agent-14 § 3.6.1](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3.6.1)
    pub flags: u32,
}

impl SignRequest {
    /// Ask for `data` to be signed by the key behind `identity`.
    pub fn new(identity: &Identity, data: impl Into<Vec<u8>>, flags: u32) -> Self {
        Self {
            pubkey: identity.pubkey.clone(),
            data: data.into(),
            flags,
        }
    }
}

impl Decode for SignRequest {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let pubkey = KeyBlob::decode(reader)?;
        let data = Vec::decode(reader)?;
        let flags = u32::decode(reader)?;

        Ok(Self {
            pubkey,
            data,
            flags,
        })
    }
}

impl Encode for SignRequest {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        [
            self.pubkey.encoded_len()?,
            self.data.encoded_len()?,
            self.flags.encoded_len()?,
        ]
        .checked_sum()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        self.pubkey.encode(writer)?;
        self.data.encode(writer)?;
        self.flags.encode(writer)?;

        Ok(())
    }
}

/// Signature produced by the agent, still in its wire encoding.
///
/// Sent in a [`Response::SignResponse`](super::Response::SignResponse) (`SSH_AGENT_SIGN_RESPONSE`) message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignatureBlob(Vec<u8>);

impl SignatureBlob {
    /// Parse the blob as an SSH signature (`string algorithm, string blob`).
    pub fn to_signature(&self) -> Result<Signature> {
        Ok(Signature::decode(&mut &self.0[..])?)
    }

    /// Borrow the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take ownership of the raw signature bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for SignatureBlob {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl TryFrom<&Signature> for SignatureBlob {
    type Error = Error;

    fn try_from(signature: &Signature) -> Result<Self> {
        let mut blob = Vec::with_capacity(signature.encoded_len()?);
        signature.encode(&mut blob)?;
        Ok(Self(blob))
    }
}

impl AsRef<[u8]> for SignatureBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Decode for SignatureBlob {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        Ok(Self(Vec::decode(reader)?))
    }
}

impl Encode for SignatureBlob {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        self.0.encoded_len()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        self.0.encode(writer)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use ssh_key::{Algorithm, Signature};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn sign_request_layout() -> TestResult {
        let request = SignRequest {
            pubkey: b"key".to_vec().into(),
            data: b"hello".to_vec(),
            flags: SSH_AGENT_RSA_SHA2_512,
        };
        let mut buffer = vec![];
        request.encode(&mut buffer)?;
        assert_eq!(
            buffer,
            hex!("00000003 6b6579 00000005 68656c6c6f 00000004")
        );
        assert_eq!(SignRequest::decode(&mut &buffer[..])?, request);
        Ok(())
    }

    #[test]
    fn signature_blob_parses_through_ssh_key() -> TestResult {
        let signature = Signature::new(Algorithm::Ed25519, vec![9; 64])?;
        let blob = SignatureBlob::try_from(&signature)?;
        assert_eq!(blob.to_signature()?, signature);
        Ok(())
    }
}
