//! SSH agent client support.
//!
//! The async [`Client`] serializes round trips behind a lock, so it can be
//! shared between tasks. A round trip whose future is dropped before the
//! response arrives leaves its request in flight; the next call detects
//! this and fails with [`ProtoError::RequestOutstanding`], since the stale
//! response would otherwise be taken for its own.
//!
//! As with the blocking client, a fatal error closes the socket and every
//! later call fails with [`AgentError::Faulted`].

use std::fmt;

use futures::{SinkExt, TryStreamExt};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

#[cfg(unix)]
use crate::config::ClientConfig;

use crate::{
    codec::Codec,
    error::{AgentError, ConnectionError},
    exchange::{self, Negotiation},
    proto::{
        extension::{CertificateResponse, CreateCertificate, Query},
        AdvertisedExtension, Extension, ExtensionCall, ExtensionRegistry, Identity,
        MessageExtension, ProtoError, Request, RequestCode, Response, SignRequest, SignatureBlob,
        Unparsed,
    },
    transport::classify,
};

/// Streams the async client can run over.
pub trait AgentStream: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> AgentStream for T where T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin + 'static {}

#[derive(Debug)]
struct Connection<Stream: AgentStream> {
    adapter: Option<Framed<Stream, Codec<Response, Request>>>,
    pending: Option<RequestCode>,
    faulted: bool,
    negotiation: Negotiation,
}

/// Report a hangup the way the blocking transport does.
fn hangup(error: AgentError) -> AgentError {
    match error {
        AgentError::IO(error) => classify(error),
        other => other,
    }
}

impl<Stream: AgentStream> Connection<Stream> {
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
            if self.adapter.take().is_some() {
                info!("Closed agent connection");
            }
        }
        error
    }

    async fn handle(&mut self, request: Request) -> Result<Response, AgentError> {
        self.usable()?;
        if let Some(outstanding) = self.pending {
            let error = ProtoError::RequestOutstanding {
                outstanding: outstanding.to_u8(),
            };
            return Err(self.fault(error.into()));
        }

        let code = request.code();
        debug!("Sending {code:?} request");
        self.pending = Some(code);
        let sent = match self.adapter.as_mut() {
            Some(adapter) => adapter.send(request).await.map_err(hangup),
            None => Err(AgentError::ConnectionClosed),
        };
        self.check(sent)?;

        let received = match self.adapter.as_mut() {
            Some(adapter) => adapter.try_next().await.map_err(hangup),
            None => Err(AgentError::ConnectionClosed),
        };
        let Some(response) = self.check(received)? else {
            return Err(self.fault(AgentError::ConnectionClosed));
        };
        self.pending = None;
        debug!("Received {:?} for {code:?}", response.code());
        Ok(response)
    }

    async fn query(&mut self, registry: &ExtensionRegistry) -> Result<Vec<String>, AgentError> {
        self.usable()?;
        let descriptor = exchange::resolve(registry, Query::NAME)?;
        let response = self
            .handle(Request::Extension(Extension::new_message(Query)?))
            .await?;
        let names = self.check(exchange::query_names(descriptor, response))?;
        self.negotiation.remember(&names);
        Ok(names)
    }

    async fn advertised_names(
        &mut self,
        registry: &ExtensionRegistry,
    ) -> Result<Vec<String>, AgentError> {
        if let Some(names) = self.negotiation.cached() {
            return Ok(names);
        }
        let outcome = self.query(registry).await;
        self.negotiation.settle(outcome)
    }

    async fn call_extension(
        &mut self,
        registry: &ExtensionRegistry,
        name: &str,
        contents: Unparsed,
    ) -> Result<Unparsed, AgentError> {
        self.usable()?;
        if self.negotiation.needs_query(registry, name)? {
            self.advertised_names(registry).await?;
        }
        let descriptor = self.negotiation.admit(registry, name)?;

        let response = self
            .handle(Request::Extension(Extension {
                name: name.into(),
                details: contents,
            }))
            .await?;
        self.check(exchange::extension_contents(descriptor, response))
    }
}

/// SSH agent client
#[derive(Debug)]
pub struct Client<Stream: AgentStream> {
    connection: Mutex<Connection<Stream>>,
    registry: ExtensionRegistry,
}

impl<Stream: AgentStream> Client<Stream> {
    /// Create a new SSH agent client wrapping a given socket.
    pub fn new(socket: Stream) -> Self {
        let adapter = Framed::new(socket, Codec::default());
        Self {
            connection: Mutex::new(Connection {
                adapter: Some(adapter),
                pending: None,
                faulted: false,
                negotiation: Negotiation::default(),
            }),
            registry: ExtensionRegistry::default(),
        }
    }

    /// Replace the extension registry.
    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override the maximum frame length.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        if let Some(adapter) = self.connection.get_mut().adapter.as_mut() {
            *adapter.codec_mut() = Codec::new(max_frame_len);
        }
        self
    }

    /// Extensions this client knows how to call.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Whether an earlier fatal error invalidated this client.
    pub async fn is_faulted(&self) -> bool {
        self.connection.lock().await.faulted
    }

    /// Perform one round trip.
    pub async fn handle(&self, request: Request) -> Result<Response, AgentError> {
        self.connection.lock().await.handle(request).await
    }

    /// Request a list of keys managed by this session.
    pub async fn request_identities(&self) -> Result<Vec<Identity>, AgentError> {
        let mut connection = self.connection.lock().await;
        let response = connection.handle(Request::RequestIdentities).await?;
        connection.check(exchange::identities(response))
    }

    /// Perform a private key signature operation.
    pub async fn sign(&self, request: SignRequest) -> Result<SignatureBlob, AgentError> {
        let mut connection = self.connection.lock().await;
        let response = connection.handle(Request::SignRequest(request)).await?;
        connection.check(exchange::signature(response))
    }

    /// Invoke an extension by name and return the raw reply contents.
    ///
    /// See [`blocking::Client::call_extension`](crate::blocking::Client::call_extension).
    pub async fn call_extension(
        &self,
        name: &str,
        contents: impl Into<Unparsed>,
    ) -> Result<Unparsed, AgentError> {
        let contents = contents.into();
        let mut connection = self.connection.lock().await;
        connection
            .call_extension(&self.registry, name, contents)
            .await
    }

    /// Invoke a typed extension and decode its reply.
    pub async fn extension_call<T: ExtensionCall>(
        &self,
        request: T,
    ) -> Result<T::Response, AgentError> {
        let contents = Unparsed::new(&request)?;
        let mut connection = self.connection.lock().await;
        let contents = connection
            .call_extension(&self.registry, T::NAME, contents)
            .await?;
        let response = contents.parse::<T::Response>().map_err(AgentError::from);
        connection.check(response)
    }

    /// Ask the agent which extensions it supports.
    pub async fn list_extensions(&self) -> Result<Vec<String>, AgentError> {
        self.connection.lock().await.query(&self.registry).await
    }

    /// Advertised extensions, marked by whether this client can call them.
    pub async fn advertised_extensions(&self) -> Result<Vec<AdvertisedExtension>, AgentError> {
        let mut connection = self.connection.lock().await;
        connection.usable()?;
        let names = connection.advertised_names(&self.registry).await?;
        Ok(self.registry.describe(names))
    }

    /// Ask the agent to issue an X.509 certificate.
    pub async fn create_certificate(
        &self,
        request: CreateCertificate,
    ) -> Result<CertificateResponse, AgentError> {
        self.extension_call(request).await
    }
}

/// Wrap a connected Unix socket or TCP stream into a client.
///
/// Must be called from within a Tokio runtime.
pub fn connect(stream: service_binding::Stream) -> Result<Client<Box<dyn AgentStream>>, AgentError> {
    match stream {
        #[cfg(unix)]
        service_binding::Stream::Unix(socket) => {
            socket.set_nonblocking(true)?;
            let socket = tokio::net::UnixStream::from_std(socket)?;
            Ok(Client::new(Box::new(socket)))
        }
        service_binding::Stream::Tcp(socket) => {
            socket.set_nonblocking(true)?;
            let socket = tokio::net::TcpStream::from_std(socket)?;
            Ok(Client::new(Box::new(socket)))
        }
        #[allow(unreachable_patterns)]
        _ => Err(ConnectionError::Unsupported("named pipes are not supported".into()).into()),
    }
}

/// Connect to the agent described by `config`.
#[cfg(unix)]
pub fn connect_config(config: &ClientConfig) -> Result<Client<Box<dyn AgentStream>>, AgentError> {
    let socket = std::os::unix::net::UnixStream::connect(&config.socket).map_err(|source| {
        ConnectionError::Connect {
            path: config.socket.clone(),
            source,
        }
    })?;
    Ok(connect(service_binding::Stream::Unix(socket))?.with_max_frame_len(config.max_frame_len))
}
