//! Data returned to the client when listing keys.

use ssh_encoding::{self, CheckedSum, Decode, Encode, Reader, Writer};
use ssh_key::{public::KeyData, Fingerprint, HashAlg};

use crate::proto::{Error, Result};

/// Public key blob exactly as the agent sent it.
///
/// The protocol layer never interprets the blob; [`KeyBlob::public_key`]
/// hands it to `ssh-key` when a caller needs the parsed form.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyBlob(Vec<u8>);

impl KeyBlob {
    /// Parse the blob as an SSH public key.
    pub fn public_key(&self) -> Result<KeyData> {
        Ok(KeyData::decode(&mut &self.0[..])?)
    }

    /// Borrow the raw blob.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take ownership of the raw blob.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for KeyBlob {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for KeyBlob {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl TryFrom<&KeyData> for KeyBlob {
    type Error = Error;

    fn try_from(key: &KeyData) -> Result<Self> {
        let mut blob = Vec::with_capacity(key.encoded_len()?);
        key.encode(&mut blob)?;
        Ok(Self(blob))
    }
}

impl AsRef<[u8]> for KeyBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Decode for KeyBlob {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        Ok(Self(Vec::decode(reader)?))
    }
}

impl Encode for KeyBlob {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        self.0.encoded_len()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        self.0.encode(writer)
    }
}

/// Data returned to the client when listing keys.
///
/// A list of these structures are sent in a [`Response::IdentitiesAnswer`](super::Response::IdentitiesAnswer) (`SSH_AGENT_IDENTITIES_ANSWER`) message body.
///
/// Described in [draft-miller-ssh-agent-14 § 3.5](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3.5)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Identity {
    /// A standard public-key encoding of an underlying key.
    pub pubkey: KeyBlob,

    /// A human-readable comment
    pub comment: String,
}

impl Identity {
    /// Parse the identity's key blob.
    pub fn public_key(&self) -> Result<KeyData> {
        self.pubkey.public_key()
    }

    /// Fingerprint of the identity's public key.
    pub fn fingerprint(&self, hash_alg: HashAlg) -> Result<Fingerprint> {
        Ok(self.public_key()?.fingerprint(hash_alg))
    }

    /// Decodes a `uint32` count followed by that many identities, in wire order.
    pub(crate) fn decode_vec(reader: &mut impl Reader) -> Result<Vec<Self>> {
        let len = u32::decode(reader)?;
        let mut identities = vec![];

        for _ in 0..len {
            identities.push(Self::decode(reader)?);
        }

        Ok(identities)
    }

    pub(crate) fn encoded_len_vec(identities: &[Self]) -> ssh_encoding::Result<usize> {
        let mut lengths = Vec::with_capacity(1 + identities.len());
        // Prefixed length
        lengths.push(4);

        for id in identities {
            lengths.push(id.encoded_len()?);
        }

        lengths.checked_sum()
    }

    pub(crate) fn encode_vec(
        identities: &[Self],
        writer: &mut impl Writer,
    ) -> ssh_encoding::Result<()> {
        (identities.len() as u32).encode(writer)?;
        for id in identities {
            id.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for Identity {
    type Error = Error;

    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let pubkey = KeyBlob::decode(reader)?;
        let comment = String::decode(reader)?;

        Ok(Self { pubkey, comment })
    }
}

impl Encode for Identity {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        [self.pubkey.encoded_len()?, self.comment.encoded_len()?].checked_sum()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        self.pubkey.encode(writer)?;
        self.comment.encode(writer)?;

        Ok(())
    }
}
