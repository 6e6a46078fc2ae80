//! Interpretation of agent replies, shared by the blocking and async clients.

use log::debug;

use crate::{
    error::{AgentError, Unsupported},
    proto::{
        extension::{Query, QueryResponse},
        ExtensionDescriptor, ExtensionRegistry, Identity, MessageExtension, ProtoError,
        RequestCode, Response, SignatureBlob, Unparsed,
    },
};

/// A reply of the wrong type is fatal; a plain failure is not.
fn unexpected(request: RequestCode, response: Response) -> AgentError {
    match response {
        Response::Failure(failure) => failure.into(),
        other => ProtoError::UnexpectedResponse {
            expected: request.to_u8(),
            actual: other.message_id(),
        }
        .into(),
    }
}

pub(crate) fn identities(response: Response) -> Result<Vec<Identity>, AgentError> {
    match response {
        Response::IdentitiesAnswer(identities) => Ok(identities),
        other => Err(unexpected(RequestCode::RequestIdentities, other)),
    }
}

pub(crate) fn signature(response: Response) -> Result<SignatureBlob, AgentError> {
    match response {
        Response::SignResponse(signature) => Ok(signature),
        other => Err(unexpected(RequestCode::SignRequest, other)),
    }
}

pub(crate) fn resolve<'r>(
    registry: &'r ExtensionRegistry,
    name: &str,
) -> Result<&'r ExtensionDescriptor, AgentError> {
    registry
        .get(name)
        .ok_or_else(|| AgentError::unsupported(name, Unsupported::NotRegistered))
}

pub(crate) fn advertised(name: &str, advertised: &[String]) -> Result<(), AgentError> {
    if advertised.iter().any(|candidate| candidate == name) {
        Ok(())
    } else {
        Err(AgentError::unsupported(name, Unsupported::NotAdvertised))
    }
}

/// Contents of a successful extension reply.
///
/// `SSH_AGENT_FAILURE` means the agent does not implement the extension;
/// `SSH_AGENT_EXTENSION_FAILURE` means it does, but the call failed.
pub(crate) fn extension_contents(
    descriptor: &ExtensionDescriptor,
    response: Response,
) -> Result<Unparsed, AgentError> {
    let contents = match response {
        Response::Success(contents) => contents,
        Response::ExtensionResponse(extension) if extension.name == descriptor.name => {
            extension.details
        }
        Response::Failure(_) => {
            return Err(AgentError::unsupported(
                descriptor.name.to_string(),
                Unsupported::Rejected,
            ))
        }
        Response::ExtensionFailure(failure) => return Err(failure.into()),
        other => return Err(unexpected(RequestCode::Extension, other)),
    };
    descriptor.check_response(contents.as_bytes())?;
    Ok(contents)
}

/// Advertised names from a `query` reply.
pub(crate) fn query_names(
    descriptor: &ExtensionDescriptor,
    response: Response,
) -> Result<Vec<String>, AgentError> {
    let QueryResponse { extensions } = extension_contents(descriptor, response)?.parse()?;
    Ok(extensions)
}

/// Which extensions one connection may call.
///
/// The agent's `query` reply is fetched once and kept for the lifetime of
/// the connection. An agent that refuses `query` advertises nothing.
#[derive(Debug, Default)]
pub(crate) struct Negotiation {
    advertised: Option<Vec<String>>,
}

impl Negotiation {
    /// Advertised names, if `query` has been answered.
    pub(crate) fn cached(&self) -> Option<Vec<String>> {
        self.advertised.clone()
    }

    /// Replace the advertised names.
    pub(crate) fn remember(&mut self, names: &[String]) {
        self.advertised = Some(names.to_vec());
    }

    /// Outcome of the implicit `query` sent before the first extension call.
    pub(crate) fn settle(
        &mut self,
        outcome: Result<Vec<String>, AgentError>,
    ) -> Result<Vec<String>, AgentError> {
        match outcome {
            Err(AgentError::UnsupportedExtension { name, cause }) => {
                debug!("Extension query unavailable ({name}: {cause}), assuming none");
                self.advertised = Some(vec![]);
                Ok(vec![])
            }
            outcome => outcome,
        }
    }

    /// Whether `name` can only be checked after asking the agent.
    ///
    /// Fails right away for names missing from `registry`.
    pub(crate) fn needs_query(
        &self,
        registry: &ExtensionRegistry,
        name: &str,
    ) -> Result<bool, AgentError> {
        resolve(registry, name)?;
        Ok(name != Query::NAME && self.advertised.is_none())
    }

    /// Registry entry for `name`, provided the agent advertised it.
    pub(crate) fn admit<'r>(
        &self,
        registry: &'r ExtensionRegistry,
        name: &str,
    ) -> Result<&'r ExtensionDescriptor, AgentError> {
        let descriptor = resolve(registry, name)?;
        if name != Query::NAME {
            advertised(name, self.advertised.as_deref().unwrap_or_default())?;
        }
        Ok(descriptor)
    }
}
