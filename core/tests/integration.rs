//! Live exchanges through libcurl against the mock SOAP endpoint.
//!
//! # Design
//! Starts the mock server on a random port, then drives the curl-backed
//! transport over real HTTP. The endpoint demands Basic credentials, so
//! every successful call also exercises libcurl's auth negotiation (first
//! attempt unauthenticated, `401` challenge, retry with credentials).

use std::net::SocketAddr;

use mock_server::Credentials;
use ntlm_soap_core::{
    AuthenticatedSoapTransport, ClientOptions, EngineOption, Error, NtlmSoapClient, OptionSet,
    SoapVersion, TransportConfig,
};

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, Credentials::new("alice", "secret")).await
        })
        .unwrap();
    });

    addr
}

fn config(password: &str) -> TransportConfig {
    TransportConfig::new("alice", password)
        .unwrap()
        .with_transport_options(OptionSet::new().with(EngineOption::TimeoutMs(10_000)))
}

#[test]
fn authenticated_exchange_lifecycle() {
    let addr = spawn_server();
    let location = format!("http://{addr}/soap");
    let mut transport = AuthenticatedSoapTransport::new(config("secret"));

    // Step 1: nothing has been sent yet.
    assert!(matches!(transport.response_code(), Err(Error::State(_))));

    // Step 2: first call negotiates auth and returns the echo envelope.
    let body = transport
        .perform_request("<xml request/>", &location, "DoThing", SoapVersion::V1_1, false)
        .unwrap();
    assert!(
        body.contains("<EchoResponse action=\"DoThing\" length=\"14\"/>"),
        "{body}"
    );
    assert!(body.starts_with("<?xml"), "body must not contain headers: {body}");
    assert_eq!(transport.response_code().unwrap(), 200);

    let headers = transport.last_response_headers().unwrap();
    assert!(headers.contains("200 OK"), "{headers}");
    assert!(headers.to_ascii_lowercase().contains("content-type: text/xml"));
    assert!(transport
        .last_request_headers()
        .ends_with("Expect: 100-continue\n"));
    assert_eq!(
        transport.effective_url().unwrap().as_deref(),
        Some(location.as_str())
    );

    // Step 3: second call on the same handle.
    let body = transport
        .perform_request("<again/>", &location, "Again", SoapVersion::V1_1, false)
        .unwrap();
    assert!(body.contains("action=\"Again\" length=\"8\""), "{body}");
    assert_eq!(transport.connected_location(), Some(location.as_str()));

    // Step 4: a different path replaces the handle; control references go.
    let dirty = format!("http://{addr}/soap/dirty");
    let body = transport
        .perform_request("<a/>", &dirty, "Dirty", SoapVersion::V1_1, false)
        .unwrap();
    assert!(body.contains("<Text>a b&#x09;c d</Text>"), "{body}");
    assert_eq!(transport.connected_location(), Some(dirty.as_str()));

    // Step 5: a SOAP fault is a successful exchange at this layer.
    let fault = format!("http://{addr}/soap/fault");
    let body = transport
        .perform_request("<a/>", &fault, "Fault", SoapVersion::V1_1, false)
        .unwrap();
    assert!(body.contains("<faultstring>boom</faultstring>"));
    assert_eq!(transport.response_code().unwrap(), 500);
}

#[test]
fn rejected_credentials_surface_as_status_code() {
    let addr = spawn_server();
    let mut transport = AuthenticatedSoapTransport::new(config("wrong"));

    let body = transport
        .perform_request(
            "<a/>",
            &format!("http://{addr}/soap"),
            "DoThing",
            SoapVersion::V1_1,
            false,
        )
        .unwrap();

    assert!(body.is_empty(), "{body}");
    assert_eq!(transport.response_code().unwrap(), 401);
    assert!(transport.last_response_headers().is_some());
}

#[test]
fn refused_connection_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut transport = AuthenticatedSoapTransport::new(config("secret"));

    let err = transport
        .perform_request(
            "<a/>",
            &format!("http://{addr}/soap"),
            "DoThing",
            SoapVersion::V1_1,
            false,
        )
        .unwrap_err();

    assert_eq!(err.code(), Some(7), "{err}");
    assert!(transport.last_response().is_none());
    assert!(transport.last_response_headers().is_none());
    assert_eq!(transport.last_request(), "<a/>");
}

#[test]
fn soap_client_calls_configured_location() {
    let addr = spawn_server();
    let options = ClientOptions {
        location: Some(format!("http://{addr}/soap")),
        curlopts: OptionSet::new().with(EngineOption::TimeoutMs(10_000)),
        ..ClientOptions::new("alice", "secret")
    };
    let mut client = NtlmSoapClient::new(None, options).unwrap();

    let body = client.call("urn:Ping", "<ping/>").unwrap();

    assert!(body.contains("action=\"urn:Ping\""), "{body}");
    assert_eq!(client.transport().response_code().unwrap(), 200);
}
