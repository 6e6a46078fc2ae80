//! SSH agent protocol extensions
//!
//! Extensions are invoked by name through `SSH_AGENTC_EXTENSION`. The client
//! keeps an [`ExtensionRegistry`] of the names it knows how to talk to; a name
//! must be registered before it can be called, and (except for `query`
//! itself) advertised by the agent in its `query` reply.

pub mod message;

use std::{borrow::Cow, collections::BTreeMap};

use ssh_encoding::{Decode, Encode};

pub use self::message::*;
use crate::proto::{ProtoError, ProtoResult};

/// Message extension types, sent in `SSH_AGENTC_EXTENSION` requests
/// and `SSH_AGENT_EXTENSION_RESPONSE` replies.
pub trait MessageExtension {
    /// Extension name, indicating the type of the message (as a UTF-8 string).
    ///
    /// Extension names should be suffixed by the implementation domain
    /// as per [RFC4251 § 4.2](https://www.rfc-editor.org/rfc/rfc4251.html#section-4.2),
    const NAME: &'static str;
}

/// Extension request with a typed reply.
pub trait ExtensionCall: MessageExtension + Encode {
    /// Reply decoded from the extension response contents.
    type Response: Decode<Error = ProtoError>;

    /// Shape the response contents are checked against.
    const RESPONSE: PayloadShape;
}

/// What the contents of an extension reply must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Any bytes, including none.
    Opaque,

    /// Any bytes, but at least one.
    NonEmpty,

    /// A sequence of SSH `string`s filling the whole payload.
    NameList,
}

impl PayloadShape {
    /// Whether `contents` have this shape.
    pub fn accepts(self, contents: &[u8]) -> bool {
        match self {
            Self::Opaque => true,
            Self::NonEmpty => !contents.is_empty(),
            Self::NameList => QueryResponse::decode(&mut &contents[..]).is_ok(),
        }
    }
}

/// Registry entry for one extension name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    /// Extension name as sent on the wire.
    pub name: Cow<'static, str>,

    /// Shape of the agent's reply contents.
    pub response: PayloadShape,
}

impl ExtensionDescriptor {
    /// Describe an extension by name.
    pub fn new(name: impl Into<Cow<'static, str>>, response: PayloadShape) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }

    /// Describe a typed extension.
    pub fn of<T: ExtensionCall>() -> Self {
        Self::new(T::NAME, T::RESPONSE)
    }

    /// Check reply contents for this extension.
    pub fn check_response(&self, contents: &[u8]) -> ProtoResult<()> {
        if self.response.accepts(contents) {
            Ok(())
        } else {
            Err(ProtoError::InvalidExtensionPayload {
                name: self.name.to_string(),
            })
        }
    }
}

/// An extension name reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedExtension {
    /// Name as the agent reported it.
    pub name: String,

    /// Whether the client has a registry entry for it.
    pub callable: bool,
}

/// Table of extensions the client knows how to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRegistry {
    entries: BTreeMap<Cow<'static, str>, ExtensionDescriptor>,
}

impl ExtensionRegistry {
    /// Registry without any entries, not even `query`.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry, replacing any previous entry with the same name.
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> &mut Self {
        self.entries.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Look up the entry for `name`.
    pub fn get(&self, name: &str) -> Option<&ExtensionDescriptor> {
        self.entries.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.entries.values()
    }

    /// Pair each advertised name with whether it can be called.
    pub fn describe<I>(&self, names: I) -> Vec<AdvertisedExtension>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.into();
                AdvertisedExtension {
                    callable: self.contains(&name),
                    name,
                }
            })
            .collect()
    }
}

impl Default for ExtensionRegistry {
    /// `query` and `certificate`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ExtensionDescriptor::of::<Query>())
            .register(ExtensionDescriptor::of::<CreateCertificate>());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_query_and_certificate() {
        let registry = ExtensionRegistry::default();
        assert_eq!(
            registry.get("query").map(|d| d.response),
            Some(PayloadShape::NameList)
        );
        assert_eq!(
            registry.get("certificate").map(|d| d.response),
            Some(PayloadShape::NonEmpty)
        );
        assert!(!registry.contains("session-bind@openssh.com"));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = ExtensionRegistry::default();
        registry.register(ExtensionDescriptor::new("certificate", PayloadShape::Opaque));
        assert_eq!(registry.iter().count(), 2);
        assert_eq!(
            registry.get("certificate").map(|d| d.response),
            Some(PayloadShape::Opaque)
        );
    }

    #[test]
    fn unknown_advertised_names_are_not_callable() {
        let registry = ExtensionRegistry::default();
        let described = registry.describe(["certificate", "session-bind@openssh.com"]);
        assert_eq!(
            described,
            vec![
                AdvertisedExtension {
                    name: "certificate".into(),
                    callable: true,
                },
                AdvertisedExtension {
                    name: "session-bind@openssh.com".into(),
                    callable: false,
                },
            ]
        );
    }

    #[test]
    fn shapes_check_contents() {
        assert!(PayloadShape::Opaque.accepts(&[]));
        assert!(!PayloadShape::NonEmpty.accepts(&[]));
        assert!(PayloadShape::NonEmpty.accepts(&[0]));
        assert!(PayloadShape::NameList.accepts(&[]));
        assert!(!PayloadShape::NameList.accepts(&[0, 0, 0, 9, b'x']));

        let descriptor = ExtensionDescriptor::of::<CreateCertificate>();
        assert!(matches!(
            descriptor.check_response(&[]),
            Err(ProtoError::InvalidExtensionPayload { name }) if name == "certificate"
        ));
    }
}
