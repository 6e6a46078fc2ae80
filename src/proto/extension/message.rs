//! SSH agent protocol extension messages
//!
//! Includes extension message definitions from:
//! - [draft-miller-ssh-agent-14](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html)
//! - the certificate issuance extension of X.509-capable agents

use ssh_encoding::{Decode, Encode, Error as EncodingError, Reader, Writer};

use super::{ExtensionCall, MessageExtension, PayloadShape};
use crate::proto::{ProtoError, Unparsed};

/// `query` message extension.
///
/// An optional extension request "query" is defined to allow a
/// client to query which, if any, extensions are supported by an agent.
///
/// Described in [draft-miller-ssh-agent-14 § 3.8.1](https://www.ietf.org/archive/id/draft-miller-ssh-agent-14.html#section-3.8.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Query;

impl MessageExtension for Query {
    const NAME: &'static str = "query";
}

impl Encode for Query {
    fn encoded_len(&self) -> Result<usize, EncodingError> {
        Ok(0)
    }

    fn encode(&self, _writer: &mut impl Writer) -> Result<(), EncodingError> {
        Ok(())
    }
}

impl Decode for Query {
    type Error = ProtoError;

    fn decode(_reader: &mut impl Reader) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

impl ExtensionCall for Query {
    type Response = QueryResponse;
    const RESPONSE: PayloadShape = PayloadShape::NameList;
}

/// Reply to the [`Query`] extension.
///
/// The names are sent as consecutive SSH `string`s filling the
/// remainder of the message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResponse {
    /// List of supported message extension names
    pub extensions: Vec<String>,
}

impl MessageExtension for QueryResponse {
    const NAME: &'static str = Query::NAME;
}

impl Encode for QueryResponse {
    fn encoded_len(&self) -> Result<usize, EncodingError> {
        self.extensions
            .iter()
            .try_fold(0usize, |total, name| {
                total
                    .checked_add(name.encoded_len()?)
                    .ok_or(EncodingError::Length)
            })
    }

    fn encode(&self, writer: &mut impl Writer) -> Result<(), EncodingError> {
        for name in &self.extensions {
            name.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for QueryResponse {
    type Error = ProtoError;

    fn decode(reader: &mut impl Reader) -> Result<Self, Self::Error> {
        let mut extensions = vec![];

        while !reader.is_finished() {
            extensions.push(String::decode(reader)?);
        }

        Ok(Self { extensions })
    }
}

/// `certificate` message extension: ask the agent to issue an X.509 certificate.
///
/// The request is assembled by the caller's key-format library (issuer
/// identity, subject name, subject public key, serial, validity window and
/// purposes) and carried here without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCertificate(pub Unparsed);

impl CreateCertificate {
    /// Wrap an already encoded certificate request.
    pub fn new(request: impl Into<Unparsed>) -> Self {
        Self(request.into())
    }
}

impl MessageExtension for CreateCertificate {
    const NAME: &'static str = "certificate";
}

impl Encode for CreateCertificate {
    fn encoded_len(&self) -> Result<usize, EncodingError> {
        self.0.encoded_len()
    }

    fn encode(&self, writer: &mut impl Writer) -> Result<(), EncodingError> {
        self.0.encode(writer)
    }
}

impl Decode for CreateCertificate {
    type Error = ProtoError;

    fn decode(reader: &mut impl Reader) -> Result<Self, Self::Error> {
        Unparsed::decode(reader).map(Self)
    }
}

impl ExtensionCall for CreateCertificate {
    type Response = CertificateResponse;
    const RESPONSE: PayloadShape = PayloadShape::NonEmpty;
}

/// Certificate issued by the agent in reply to [`CreateCertificate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateResponse(pub Unparsed);

impl CertificateResponse {
    /// Encoded certificate, as produced by the agent.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Take ownership of the encoded certificate.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

impl MessageExtension for CertificateResponse {
    const NAME: &'static str = CreateCertificate::NAME;
}

impl Encode for CertificateResponse {
    fn encoded_len(&self) -> Result<usize, EncodingError> {
        self.0.encoded_len()
    }

    fn encode(&self, writer: &mut impl Writer) -> Result<(), EncodingError> {
        self.0.encode(writer)
    }
}

impl Decode for CertificateResponse {
    type Error = ProtoError;

    fn decode(reader: &mut impl Reader) -> Result<Self, Self::Error> {
        Unparsed::decode(reader).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use testresult::TestResult;

    use super::*;
    use crate::proto::Extension;

    #[test]
    fn parse_query_response() -> TestResult {
        let mut buffer: &[u8] = &hex!(
            "00000005 7175657279"
            "0000000b 6365727469666963617465"
        );
        let response = QueryResponse::decode(&mut buffer)?;
        assert_eq!(response.extensions, ["query", "certificate"]);

        let mut encoded = vec![];
        response.encode(&mut encoded)?;
        assert_eq!(encoded.len(), response.encoded_len()?);
        assert_eq!(QueryResponse::decode(&mut &encoded[..])?, response);
        Ok(())
    }

    #[test]
    fn query_request_has_no_contents() -> TestResult {
        let extension = Extension::new_message(Query)?;
        assert_eq!(extension.name, "query");
        assert!(extension.details.is_empty());
        Ok(())
    }

    #[test]
    fn certificate_request_is_carried_verbatim() -> TestResult {
        let der = vec![0x30, 0x03, 0x02, 0x01, 0x01];
        let extension = Extension::new_message(CreateCertificate::new(der.clone()))?;
        assert_eq!(extension.details.as_bytes(), &der[..]);

        let parsed = extension.parse_message::<CreateCertificate>()?;
        assert_eq!(parsed, Some(CreateCertificate::new(der)));
        assert_eq!(extension.parse_message::<Query>()?, None);
        Ok(())
    }
}
