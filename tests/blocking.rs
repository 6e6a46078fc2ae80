#![cfg(unix)]

use std::os::unix::net::{UnixListener, UnixStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ssh_agent_x509::{
    blocking::Client,
    config::ClientConfig,
    error::{AgentError, ConnectionError, Unsupported},
    frame::{read_frame, write_frame, MAX_FRAME_LEN},
    proto::{
        extension::{CreateCertificate, QueryResponse},
        Extension, Failure, Identity, Request, Response, SignRequest, Unparsed,
    },
    ssh_encoding::Decode,
    transport::{ConnectionState, Transport},
};
use testresult::TestResult;

fn identity(pubkey: &[u8], comment: &str) -> Identity {
    Identity {
        pubkey: pubkey.into(),
        comment: comment.into(),
    }
}

/// Agent holding two opaque keys that advertises `extensions`.
fn reply(request: &Request, extensions: &[&str]) -> Response {
    match request {
        Request::RequestIdentities => Response::IdentitiesAnswer(vec![
            identity(b"keyblobA", "comment A"),
            identity(b"keyblobB", "comment B"),
        ]),
        Request::SignRequest(sign) if sign.pubkey.as_bytes() == b"keyblobA" => {
            assert_eq!(sign.data, b"hello");
            Response::SignResponse(vec![0xdeu8, 0xad, 0xbe, 0xef].into())
        }
        Request::Extension(extension) if extension.name == "query" => {
            let names = QueryResponse {
                extensions: extensions.iter().map(|name| name.to_string()).collect(),
            };
            match Unparsed::new(&names) {
                Ok(contents) => Response::Success(contents),
                Err(_) => Response::Failure(Failure::default()),
            }
        }
        Request::Extension(extension)
            if extension.name == "certificate" && extensions.contains(&"certificate") =>
        {
            let mut certificate = b"cert:".to_vec();
            certificate.extend_from_slice(extension.details.as_bytes());
            Response::Success(certificate.into())
        }
        _ => Response::Failure(Failure::default()),
    }
}

/// Serve requests until the client hangs up, returning what was received.
fn serve(
    stream: UnixStream,
    respond: impl Fn(&Request) -> Response + Send + 'static,
) -> JoinHandle<Vec<Request>> {
    thread::spawn(move || {
        let mut transport = Transport::new(stream);
        let mut received = vec![];
        while let Ok(frame) = read_frame(&mut transport, MAX_FRAME_LEN) {
            let Ok(bytes) = Unparsed::new(&frame) else {
                break;
            };
            let Ok(request) = Request::decode(&mut bytes.as_bytes()) else {
                break;
            };
            let response = respond(&request);
            received.push(request);
            if write_frame(&mut transport, &response, MAX_FRAME_LEN).is_err() {
                break;
            }
        }
        received
    })
}

type Agent = (Client<UnixStream>, JoinHandle<Vec<Request>>);

fn agent(extensions: &'static [&'static str]) -> TestResult<Agent> {
    let (client, server) = UnixStream::pair()?;
    let handle = serve(server, move |request| reply(request, extensions));
    Ok((Client::new(client), handle))
}

fn finish(client: Client<UnixStream>, agent: JoinHandle<Vec<Request>>) -> Vec<Request> {
    drop(client);
    agent.join().expect("agent thread panicked")
}

#[test]
fn identities_arrive_in_agent_order() -> TestResult {
    let (mut client, agent) = agent(&[])?;
    assert_eq!(
        client.request_identities()?,
        vec![
            identity(b"keyblobA", "comment A"),
            identity(b"keyblobB", "comment B"),
        ]
    );
    assert_eq!(finish(client, agent), vec![Request::RequestIdentities]);
    Ok(())
}

#[test]
fn empty_identity_list() -> TestResult {
    let (client, server) = UnixStream::pair()?;
    let agent = serve(server, |_| Response::IdentitiesAnswer(vec![]));
    let mut client = Client::new(client);
    assert_eq!(client.request_identities()?, vec![]);
    finish(client, agent);
    Ok(())
}

#[test]
fn sign_with_held_key() -> TestResult {
    let (mut client, agent) = agent(&[])?;
    let identities = client.request_identities()?;
    let signature = client.sign(SignRequest::new(&identities[0], b"hello".to_vec(), 0))?;
    assert_eq!(signature.as_bytes(), [0xde, 0xad, 0xbe, 0xef]);
    finish(client, agent);
    Ok(())
}

#[test]
fn sign_with_unknown_key_is_refused() -> TestResult {
    let (mut client, agent) = agent(&[])?;
    let stranger = identity(b"keyblobZ", "not held");
    assert!(matches!(
        client.sign(SignRequest::new(&stranger, b"hello".to_vec(), 0)),
        Err(AgentError::Failure { reason: None })
    ));
    assert!(!client.is_faulted());
    assert_eq!(client.request_identities()?.len(), 2);
    finish(client, agent);
    Ok(())
}

#[test]
fn unadvertised_extension_is_never_sent() -> TestResult {
    let (mut client, agent) = agent(&["query"])?;
    assert!(matches!(
        client.create_certificate(CreateCertificate::new(b"csr".to_vec())),
        Err(AgentError::UnsupportedExtension {
            cause: Unsupported::NotAdvertised,
            ..
        })
    ));
    assert!(!client.is_faulted());

    let received = finish(client, agent);
    assert_eq!(received.len(), 1, "only the query goes out: {received:?}");
    assert!(matches!(&received[0], Request::Extension(Extension { name, .. }) if name == "query"));
    Ok(())
}

#[test]
fn certificate_is_issued_after_negotiation() -> TestResult {
    let (mut client, agent) = agent(&["query", "certificate"])?;
    let certificate = client.create_certificate(CreateCertificate::new(b"csr".to_vec()))?;
    assert_eq!(certificate.as_bytes(), b"cert:csr");

    // The advertised list is cached.
    let again = client.create_certificate(CreateCertificate::new(b"csr2".to_vec()))?;
    assert_eq!(again.into_bytes(), b"cert:csr2");

    let names: Vec<_> = finish(client, agent)
        .into_iter()
        .map(|request| match request {
            Request::Extension(extension) => extension.name,
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(names, ["query", "certificate", "certificate"]);
    Ok(())
}

#[test]
fn advertised_extensions_are_marked_callable() -> TestResult {
    let (mut client, agent) = agent(&["query", "certificate", "session-bind@openssh.com"])?;
    let advertised = client.advertised_extensions()?;
    let callable: Vec<_> = advertised
        .iter()
        .map(|extension| (extension.name.as_str(), extension.callable))
        .collect();
    assert_eq!(
        callable,
        [
            ("query", true),
            ("certificate", true),
            ("session-bind@openssh.com", false)
        ]
    );
    finish(client, agent);
    Ok(())
}

#[test]
fn shutdown_cancels_a_blocked_call() -> TestResult {
    let (client, server) = UnixStream::pair()?;
    // Reads the request, never answers.
    let agent = thread::spawn(move || {
        let mut transport = Transport::new(server);
        while read_frame(&mut transport, MAX_FRAME_LEN).is_ok() {}
    });

    let mut client = Client::new(client);
    let handle = client.shutdown_handle()?;
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        handle.shutdown()
    });

    assert!(matches!(
        client.request_identities(),
        Err(AgentError::ConnectionClosed)
    ));
    assert!(client.is_faulted());
    assert!(matches!(
        client.request_identities(),
        Err(AgentError::Faulted)
    ));

    canceller.join().expect("canceller panicked")?;
    drop(client);
    agent.join().expect("agent thread panicked");
    Ok(())
}

#[test]
fn connects_on_first_use() -> TestResult {
    let path =
        std::env::temp_dir().join(format!("ssh-agent-x509-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;

    let mut client = Client::<UnixStream>::from_config(&ClientConfig::new(&path));
    assert_eq!(client.state(), ConnectionState::Unopened);

    let agent = thread::spawn(move || -> std::io::Result<Vec<Request>> {
        let (stream, _) = listener.accept()?;
        Ok(serve(stream, |request| reply(request, &[]))
            .join()
            .unwrap_or_default())
    });

    assert_eq!(client.request_identities()?.len(), 2);
    assert_eq!(client.state(), ConnectionState::Open);

    client.close();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(
        client.request_identities(),
        Err(AgentError::ConnectionClosed)
    ));

    drop(client);
    let received = agent.join().expect("agent thread panicked")?;
    assert_eq!(received, vec![Request::RequestIdentities]);
    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn missing_socket_is_a_connection_error() {
    let path = std::env::temp_dir().join("ssh-agent-x509-missing.sock");
    let mut client = Client::<UnixStream>::from_config(&ClientConfig::new(&path));
    assert!(matches!(
        client.request_identities(),
        Err(AgentError::Connection(ConnectionError::Connect { .. }))
    ));
}
