//! Integration tests for client middleware and transports.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use courier::auth::ClientCertificateAuth;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, ServerConnection, StreamOwned};
use courier::tower::service_fn;
use courier::tower::util::MapRequestLayer;
use courier::{Error, HyperClient, Request, Response};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, headers, method, path},
};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn roots(name: &str) -> RootCertStore {
    let pem = std::fs::read(fixture(name)).expect("read roots");
    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(&pem) {
        roots.add(cert.expect("pem certificate")).expect("trust anchor");
    }
    roots
}

/// HTTPS server requiring a client certificate issued by `ca.crt`.
///
/// Runs on a background thread and answers every request with `200 mtls`.
fn spawn_mtls_server() -> u16 {
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots("ca.crt")))
        .build()
        .expect("client verifier");
    let chain = CertificateDer::pem_slice_iter(&std::fs::read(fixture("server.crt")).expect("read cert"))
        .collect::<Result<Vec<_>, _>>()
        .expect("server chain");
    let key = PrivateKeyDer::from_pem_slice(&std::fs::read(fixture("server.key")).expect("read key"))
        .expect("server key");
    let config = Arc::new(
        ServerConfig::builder()
            .with_client_cert_verifier(verifier)
            .with_single_cert(chain, key)
            .expect("server config"),
    );

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    std::thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let Ok(connection) = ServerConnection::new(Arc::clone(&config)) else {
                continue;
            };
            let mut tls = StreamOwned::new(connection, stream);
            // Handshake failures surface here and just drop the connection.
            let _ = answer(&mut tls);
        }
    });
    port
}

fn answer<S: Read + Write>(stream: &mut S) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut buf)?;
        if read == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..read]);
    }
    stream.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\nconnection: close\r\n\r\nmtls")?;
    stream.flush()
}

fn tag(order: &'static str) -> MapRequestLayer<impl Fn(Request) -> Request + Clone> {
    MapRequestLayer::new(move |mut request: Request| {
        let value = match request.header("X-Order") {
            Some(existing) => format!("{existing},{order}"),
            None => order.to_string(),
        };
        request.set_header("X-Order", value);
        request
    })
}

/// Test that logging middleware doesn't break request/response flow.
#[tokio::test]
async fn test_logging_middleware() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"logged": true})))
        .mount(&mock_server)
        .await;

    let client = HyperClient::builder().with_debug_logging().build();

    let mut response = client
        .get(format!("{}/logged", mock_server.uri()))
        .execute()
        .await
        .expect("response");

    assert!(response.is_success());
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["logged"], true);
}

/// Test that layers run in the order they were added.
#[tokio::test]
async fn test_layer_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(headers("X-Order", vec!["outer", "inner"]))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HyperClient::builder()
        .layer(tag("outer"))
        .layer(tag("inner"))
        .with_logging()
        .build();

    let response = client.get(mock_server.uri()).execute().await.expect("response");
    assert_eq!(response.status(), 200);
}

/// Test that a custom transport receives the finalized request.
#[tokio::test]
async fn test_custom_transport() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = Arc::clone(&seen);

    let transport = service_fn(move |request: Request| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder
                .lock()
                .expect("lock")
                .push(format!("{} {}", request.method(), request.url()));
            Ok::<_, Error>(Response::from_bytes(202, HashMap::new(), "accepted"))
        }
    });

    let client = HyperClient::builder().transport(transport).build();
    let mut response = client
        .delete("https://api.example.com/items/7")
        .with_query_param("force", true)
        .execute()
        .await
        .expect("response");

    assert_eq!(response.status(), 202);
    assert_eq!(response.text().await.expect("text"), "accepted");
    assert_eq!(
        seen.lock().expect("lock").as_slice(),
        ["DELETE https://api.example.com/items/7?force=true"]
    );
}

/// Test that a transport installed by an auth strategy keeps the client layers.
#[tokio::test]
async fn test_certificate_transport_keeps_layers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mtls"))
        .and(header("X-Order", "layer"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = ClientCertificateAuth::from_pem_files(fixture("client.crt"), fixture("client.key"))
        .expect("certificate");
    let client = HyperClient::builder().layer(tag("layer")).build();

    let response = client
        .get(format!("{}/mtls", mock_server.uri()))
        .with_auth(&auth)
        .await
        .execute()
        .await
        .expect("response");
    assert_eq!(response.status(), 200);
}

/// Test that the client certificate is presented in the TLS handshake.
#[tokio::test]
async fn test_client_certificate_handshake() {
    let port = spawn_mtls_server();
    let server_ca = std::fs::read(fixture("server-ca.crt")).expect("read server ca");
    let auth = ClientCertificateAuth::from_pem_files(fixture("client.crt"), fixture("client.key"))
        .expect("certificate")
        .with_ca_certificates_pem(&server_ca)
        .expect("server ca");

    let mut response = courier::get(format!("https://127.0.0.1:{port}/mtls"))
        .with_auth(&auth)
        .await
        .execute()
        .await
        .expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("text"), "mtls");
}

/// Test that the server refuses a handshake without a client certificate.
#[tokio::test]
async fn test_handshake_without_client_certificate_fails() {
    let port = spawn_mtls_server();
    let tls = rustls::ClientConfig::builder()
        .with_root_certificates(roots("server-ca.crt"))
        .with_no_client_auth();
    let client = HyperClient::builder().tls_config(tls).build();

    let result = client
        .get(format!("https://127.0.0.1:{port}/mtls"))
        .execute()
        .await;

    assert!(result.is_err(), "expected a rejected handshake, got {result:?}");
}

/// Test that the PKCS#12 loader reads files.
#[test]
fn test_pkcs12_file_loader() {
    let auth = ClientCertificateAuth::from_pkcs12_file(fixture("client.p12"), "secret")
        .expect("archive");
    assert_eq!(auth.certificates().len(), 1);
    assert!(auth.ca_certificates().is_some());
}
