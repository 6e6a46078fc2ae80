//! Blocking SSH agent client API.
//!
//! Blocking API is always enabled since it doesn't use additional
//! dependencies over what is in the `proto` module and Rust standard
//! library.
//!
//! Every call is one round trip: the request is written, then exactly one
//! response is read before anything else may be sent. A client that hits a
//! fatal error (see [`AgentError::is_fatal`]) closes its connection and
//! refuses further calls with [`AgentError::Faulted`].
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(unix)]
//! # fn main() -> testresult::TestResult {
//! use ssh_agent_x509::blocking::Client;
//!
//! let mut client = Client::from_env()?;
//!
//! eprintln!(
//!     "Identities that this agent knows of: {:#?}",
//!     client.request_identities()?
//! );
//! # Ok(()) }
//! # #[cfg(windows)] fn main() { }
//! ```

use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use log::{debug, warn};

use crate::{
    config::ClientConfig,
    error::AgentError,
    exchange::{self, Negotiation},
    frame::{self, MAX_FRAME_LEN},
    proto::{
        extension::{CertificateResponse, CreateCertificate, Query},
        AdvertisedExtension, Extension, ExtensionCall, ExtensionRegistry, Identity,
        MessageExtension, ProtoError, Request, RequestCode, Response, SignRequest, SignatureBlob,
        Unparsed,
    },
    transport::{Connect, ConnectionState, Transport},
};
#[cfg(unix)]
use crate::transport::ShutdownHandle;

/// Blocking SSH agent client.
#[derive(Debug)]
pub struct Client<S: Read + Write> {
    transport: Transport<S>,
    registry: ExtensionRegistry,
    max_frame_len: usize,
    pending: Option<RequestCode>,
    faulted: bool,
    negotiation: Negotiation,
}

impl<S: Read + Write> Client<S> {
    /// Construct a new SSH agent client for the given transport stream.
    pub fn new(stream: S) -> Self {
        Self::with_transport(Transport::new(stream))
    }

    fn with_transport(transport: Transport<S>) -> Self {
        Self {
            transport,
            registry: ExtensionRegistry::default(),
            max_frame_len: MAX_FRAME_LEN,
            pending: None,
            faulted: false,
            negotiation: Negotiation::default(),
        }
    }

    /// Replace the extension registry.
    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override the maximum frame length.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Extensions this client knows how to call.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Lifecycle state of the underlying connection.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Whether an earlier fatal error invalidated this client.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Connect now instead of on the first request.
    pub fn connect(&mut self) -> Result<(), AgentError> {
        self.usable()?;
        self.transport.open()
    }

    /// Close the connection. Later calls fail with [`AgentError::ConnectionClosed`].
    pub fn close(&mut self) {
        self.pending = None;
        self.transport.close();
    }

    /// Extracts inner stream, if still open, by consuming this object.
    pub fn into_inner(self) -> Option<S> {
        self.transport.into_inner()
    }

    /// Write a request without waiting for its response.
    ///
    /// Fails with [`ProtoError::RequestOutstanding`] if the response to an
    /// earlier request has not been [received](Self::receive) yet; the frame
    /// carries no request identifier, so the client cannot tell the
    /// responses apart and faults instead.
    pub fn send(&mut self, request: &Request) -> Result<(), AgentError> {
        self.usable()?;
        if let Some(outstanding) = self.pending {
            let error = ProtoError::RequestOutstanding {
                outstanding: outstanding.to_u8(),
            };
            return Err(self.fault(error.into()));
        }

        debug!("Sending {:?} request", request.code());
        let written = frame::write_frame(&mut self.transport, request, self.max_frame_len);
        self.check(written)?;
        self.pending = Some(request.code());
        Ok(())
    }

    /// Read the response to the request written by [`send`](Self::send).
    pub fn receive(&mut self) -> Result<Response, AgentError> {
        self.usable()?;
        let Some(request) = self.pending else {
            return Err(self.fault(ProtoError::NothingOutstanding.into()));
        };

        let frame = frame::read_frame(&mut self.transport, self.max_frame_len);
        let frame = self.check(frame)?;
        self.pending = None;

        let response = frame.to_response().map_err(AgentError::from);
        let response = self.check(response)?;
        debug!("Received {:?} for {request:?}", response.code());
        Ok(response)
    }

    /// Perform one round trip.
    pub fn handle(&mut self, request: Request) -> Result<Response, AgentError> {
        self.send(&request)?;
        self.receive()
    }

    /// Request a list of keys managed by this session.
    ///
    /// The identities keep the order the agent sent them in.
    pub fn request_identities(&mut self) -> Result<Vec<Identity>, AgentError> {
        let response = self.handle(Request::RequestIdentities)?;
        self.check(exchange::identities(response))
    }

    /// Perform a private key signature operation.
    pub fn sign(&mut self, request: SignRequest) -> Result<SignatureBlob, AgentError> {
        let response = self.handle(Request::SignRequest(request))?;
        self.check(exchange::signature(response))
    }

    /// Invoke an extension by name and return the raw reply contents.
    ///
    /// The name must be in the [registry](Self::registry). Any name other
    /// than `query` must also be advertised by the agent; the advertised
    /// list is fetched once per connection. Unknown or unadvertised names
    /// fail with [`AgentError::UnsupportedExtension`] before anything is sent.
    pub fn call_extension(
        &mut self,
        name: &str,
        contents: impl Into<Unparsed>,
    ) -> Result<Unparsed, AgentError> {
        self.usable()?;
        if self.negotiation.needs_query(&self.registry, name)? {
            self.advertised_names()?;
        }
        let descriptor = self.negotiation.admit(&self.registry, name)?.clone();

        let response = self.handle(Request::Extension(Extension {
            name: name.into(),
            details: contents.into(),
        }))?;
        self.check(exchange::extension_contents(&descriptor, response))
    }

    /// Invoke a typed extension and decode its reply.
    pub fn extension_call<T: ExtensionCall>(
        &mut self,
        request: T,
    ) -> Result<T::Response, AgentError> {
        let contents = self.call_extension(T::NAME, Unparsed::new(&request)?)?;
        let response = contents.parse::<T::Response>().map_err(AgentError::from);
        self.check(response)
    }

    /// Ask the agent which extensions it supports.
    ///
    /// Always queries the agent and refreshes the per-connection cache.
    pub fn list_extensions(&mut self) -> Result<Vec<String>, AgentError> {
        self.usable()?;
        let descriptor = exchange::resolve(&self.registry, Query::NAME)?.clone();
        let response = self.handle(Request::Extension(Extension::new_message(Query)?))?;
        let names = self.check(exchange::query_names(&descriptor, response))?;
        self.negotiation.remember(&names);
        Ok(names)
    }

    /// Advertised extensions, marked by whether this client can call them.
    pub fn advertised_extensions(&mut self) -> Result<Vec<AdvertisedExtension>, AgentError> {
        let names = self.advertised_names()?;
        Ok(self.registry.describe(names))
    }

    /// Ask the agent to issue an X.509 certificate.
    pub fn create_certificate(
        &mut self,
        request: CreateCertificate,
    ) -> Result<CertificateResponse, AgentError> {
        self.extension_call(request)
    }

    fn advertised_names(&mut self) -> Result<Vec<String>, AgentError> {
        if let Some(names) = self.negotiation.cached() {
            return Ok(names);
        }
        let outcome = self.list_extensions();
        self.negotiation.settle(outcome)
    }

    fn usable(&self) -> Result<(), AgentError> {
        if self.faulted {
            Err(AgentError::Faulted)
        } else {
            Ok(())
        }
    }

    fn check<T>(&mut self, result: Result<T, AgentError>) -> Result<T, AgentError> {
        result.map_err(|error| {
            if error.is_fatal() {
                self.fault(error)
            } else {
                error
            }
        })
    }

    fn fault(&mut self, error: AgentError) -> AgentError {
        if !self.faulted {
            warn!("Discarding agent connection: {error}");
            self.faulted = true;
            self.pending = None;
            self.transport.close();
        }
        error
    }
}

impl<S: Connect> Client<S> {
    /// Client that connects to the configured socket on first use.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(Transport::unopened(config.socket.clone()))
            .with_max_frame_len(config.max_frame_len)
    }
}

#[cfg(unix)]
impl Client<UnixStream> {
    /// Client for the agent named by `SSH_AUTH_SOCK`, connecting on first use.
    pub fn from_env() -> Result<Self, AgentError> {
        Ok(Self::from_config(&ClientConfig::from_env()?))
    }

    /// Handle that can cancel a blocked call from another thread.
    ///
    /// Connects first if needed.
    pub fn shutdown_handle(&mut self) -> Result<ShutdownHandle, AgentError> {
        self.usable()?;
        let handle = self.transport.shutdown_handle();
        self.check(handle)
    }
}
