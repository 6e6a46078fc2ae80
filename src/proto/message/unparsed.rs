//! Generic container for [`Extension`](super::Extension)-specific content

use ssh_encoding::{self, Decode, Encode, Reader, Writer};

use crate::proto::{Error, Result};

/// Generic container for [`Extension`](super::Extension)-specific content.
///
/// The bytes are carried without a length prefix; their layout is owned
/// by whoever defines the extension.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Unparsed(Vec<u8>);

impl Unparsed {
    /// Encode an SSH structure into unparsed bytes.
    pub fn new<T>(value: &T) -> Result<Self>
    where
        T: Encode,
    {
        let mut buffer = Vec::with_capacity(value.encoded_len()?);
        value.encode(&mut buffer)?;
        Ok(Self(buffer))
    }

    /// Decode unparsed bytes as SSH structures.
    pub fn parse<T>(&self) -> std::result::Result<T, <T as Decode>::Error>
    where
        T: Decode,
    {
        let mut v = &self.0[..];
        T::decode(&mut v)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take ownership of the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Number of bytes carried.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no bytes are carried.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Unparsed {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Unparsed {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for Unparsed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Decode for Unparsed {
    type Error = Error;

    /// Consumes everything left in the reader.
    fn decode(reader: &mut impl Reader) -> Result<Self> {
        let mut details = vec![0; reader.remaining_len()];
        reader.read(&mut details)?;
        Ok(Self(details))
    }
}

impl Encode for Unparsed {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        Ok(self.0.len())
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        // NOTE: Unparsed fields do not embed a length u32,
        // as the inner Vec<u8> encoding is implementation-defined
        // (usually an Extension)
        writer.write(&self.0[..])?;

        Ok(())
    }
}
