//! NTLM (NTLMv2) authentication.
//!
//! The handshake authenticates a connection, not a request, so the strategy
//! installs its own transport that runs the three legs on a single HTTP/1.1
//! connection:
//!
//! 1. the request is sent without credentials;
//! 2. if the server offers `NTLM` or `Negotiate`, a negotiate message is sent;
//! 3. the challenge is answered with an authenticate message carrying the
//!    original request.
//!
//! Servers that only offer `Basic` receive the Basic fallback header.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{AUTHORIZATION, HOST, WWW_AUTHENTICATE};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::{debug, trace};
use url::Url;

use super::{AuthError, AuthTarget, Authorization, BasicAuth};
use crate::client::{ServiceFuture, into_response};
use crate::connector::{https_connector_with, tls_config_builder};
use crate::{Error, Method, Request, Response};

type Result<T, E = Error> = std::result::Result<T, E>;

mod message;

use message::{Challenge, filetime_now, negotiate, ntowf_v2, responses, split_domain};

/// Authenticates with NTLMv2 over a dedicated HTTP/1.1 connection.
///
/// The username may carry a domain as `DOMAIN\user`.
///
/// # Example
///
/// ```ignore
/// use courier::auth::NtlmAuth;
///
/// let auth = NtlmAuth::new(r"CORP\alice", "secret");
/// let response = courier::get("https://intranet.example.com/report")
///     .with_auth(&auth)
///     .await
///     .execute()
///     .await?;
/// ```
#[derive(Clone)]
pub struct NtlmAuth {
    username: String,
    password: String,
    force_http11: bool,
    insecure_skip_verify: bool,
}

impl NtlmAuth {
    /// Create a strategy for `username` (optionally `DOMAIN\user`) and `password`.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            force_http11: true,
            insecure_skip_verify: false,
        }
    }

    /// Force HTTP/1.1.
    ///
    /// The negotiating transport always speaks HTTP/1.1; the flag is recorded
    /// for callers sharing settings with other clients.
    #[must_use]
    pub fn with_force_http11(mut self, force_http11: bool) -> Self {
        self.force_http11 = force_http11;
        self
    }

    /// Skip server certificate verification.
    #[must_use]
    pub fn with_insecure_skip_verify(mut self, insecure_skip_verify: bool) -> Self {
        self.insecure_skip_verify = insecure_skip_verify;
        self
    }

    /// The configured username, including any domain.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether HTTP/1.1 is forced.
    #[must_use]
    pub const fn force_http11(&self) -> bool {
        self.force_http11
    }
}

impl std::fmt::Debug for NtlmAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtlmAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("force_http11", &self.force_http11)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl Authorization for NtlmAuth {
    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        let basic = BasicAuth::new(&self.username, &self.password);
        target.add_header("Authorization", basic.header_value())?;

        let tls = tls_config_builder(None, self.insecure_skip_verify).with_no_client_auth();
        let config = target.client().config();
        let transport = NtlmTransport {
            credentials: Arc::new(Credentials::new(&self.username, &self.password)?),
            connector: https_connector_with(tls, true, Some(config.connect_timeout)),
            timeout: config.timeout,
        };

        let client = target.client().with_transport(BoxCloneService::new(transport));
        target.set_transport(client);
        Ok(())
    }
}

// ============================================================================
// Negotiating transport
// ============================================================================

struct Credentials {
    domain: String,
    user: String,
    ntowf: [u8; 16],
}

impl Credentials {
    fn new(username: &str, password: &str) -> Result<Self, AuthError> {
        let (domain, user) = split_domain(username);
        Ok(Self {
            domain: domain.to_string(),
            user: user.to_string(),
            ntowf: ntowf_v2(user, password, domain)?,
        })
    }

    fn negotiate_message(&self) -> Result<Vec<u8>> {
        negotiate(&self.domain).map_err(Error::authorization)
    }

    fn authenticate_message(&self, challenge: &Challenge) -> Result<Vec<u8>> {
        let timestamp = challenge.timestamp().unwrap_or_else(filetime_now);
        let responses = responses(&self.ntowf, challenge, rand::random(), timestamp)
            .map_err(Error::authorization)?;
        message::authenticate(challenge, &self.domain, &self.user, "", &responses)
            .map_err(Error::authorization)
    }
}

#[derive(Clone)]
struct NtlmTransport {
    credentials: Arc<Credentials>,
    connector: HttpsConnector<HttpConnector>,
    timeout: Duration,
}

impl NtlmTransport {
    async fn execute(self, request: Request) -> Result<Response> {
        let (method, url, mut headers, body) = request.into_parts();
        let body = body.collect().await?;

        let basic = headers
            .keys()
            .find(|name| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .cloned()
            .and_then(|name| headers.remove(&name));

        let mut connection = Connection::open(self.connector.clone(), &url, self.timeout).await?;
        let leg = Leg {
            method,
            url: &url,
            headers: &headers,
            body,
        };

        debug!(url = %url, "ntlm: anonymous request");
        let mut response = connection.send(&leg, None).await?;
        if response.status() != http::StatusCode::UNAUTHORIZED {
            return Ok(into_response(response));
        }

        let mut scheme = offered_scheme(response.headers());
        if scheme.is_none() {
            let Some(basic) = basic else {
                return Ok(into_response(response));
            };
            debug!("ntlm: not offered, retrying with basic credentials");
            drain(response).await;
            response = connection.send(&leg, Some(basic)).await?;
            if response.status() != http::StatusCode::UNAUTHORIZED {
                return Ok(into_response(response));
            }
            scheme = offered_scheme(response.headers());
        }
        let Some(scheme) = scheme else {
            return Ok(into_response(response));
        };
        drain(response).await;

        debug!(scheme, "ntlm: sending negotiate message");
        let negotiate = self.credentials.negotiate_message()?;
        let authorization = format!("{scheme} {}", STANDARD.encode(negotiate));
        let response = connection.send(&leg, Some(authorization)).await?;

        let Some(challenge) = challenge_token(response.headers(), scheme) else {
            return Ok(into_response(response));
        };
        trace!(len = challenge.len(), "ntlm: challenge received");
        let challenge = STANDARD
            .decode(challenge)
            .ok()
            .and_then(|data| Challenge::parse(&data))
            .ok_or_else(|| Error::authorization(AuthError::Ntlm("invalid challenge message".to_string())))?;
        drain(response).await;

        debug!("ntlm: sending authenticate message");
        let authenticate = self.credentials.authenticate_message(&challenge)?;
        let authorization = format!("{scheme} {}", STANDARD.encode(authenticate));
        let response = connection.send(&leg, Some(authorization)).await?;

        debug!(status = response.status().as_u16(), "ntlm: handshake finished");
        Ok(into_response(response))
    }
}

impl Service<Request> for NtlmTransport {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = self.clone();
        Box::pin(transport.execute(request))
    }
}

/// The part of a request resent on every leg.
struct Leg<'a> {
    method: Method,
    url: &'a Url,
    headers: &'a HashMap<String, String>,
    body: Bytes,
}

/// `NTLM` or `Negotiate` when offered by a 401 response.
fn offered_scheme(headers: &http::HeaderMap) -> Option<&'static str> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|value| {
            let name = value.split_whitespace().next()?;
            if name.eq_ignore_ascii_case("NTLM") {
                Some("NTLM")
            } else if name.eq_ignore_ascii_case("Negotiate") {
                Some("Negotiate")
            } else {
                None
            }
        })
}

/// The base64 token following `scheme` in `WWW-Authenticate`.
fn challenge_token(headers: &http::HeaderMap, scheme: &str) -> Option<String> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let (name, token) = value.trim().split_once(' ')?;
            let token = token.trim();
            (name.eq_ignore_ascii_case(scheme) && !token.is_empty()).then(|| token.to_string())
        })
}

async fn drain(response: http::Response<Incoming>) {
    if let Err(err) = response.into_body().collect().await {
        trace!(%err, "ntlm: failed to drain intermediate body");
    }
}

// ============================================================================
// Connection
// ============================================================================

struct Connection {
    connector: HttpsConnector<HttpConnector>,
    uri: http::Uri,
    host: String,
    timeout: Duration,
    sender: SendRequest<Full<Bytes>>,
}

impl Connection {
    async fn open(
        connector: HttpsConnector<HttpConnector>,
        url: &Url,
        timeout: Duration,
    ) -> Result<Self> {
        let uri: http::Uri = url
            .as_str()
            .parse()
            .map_err(|err: http::uri::InvalidUri| Error::invalid_request(err.to_string()))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::invalid_request(format!("missing host in {url}"))),
        };
        let sender = handshake(connector.clone(), uri.clone(), timeout).await?;

        Ok(Self {
            connector,
            uri,
            host,
            timeout,
            sender,
        })
    }

    async fn send(
        &mut self,
        leg: &Leg<'_>,
        authorization: Option<String>,
    ) -> Result<http::Response<Incoming>> {
        if self.sender.ready().await.is_err() {
            trace!(host = %self.host, "ntlm: connection closed, reconnecting");
            self.sender = handshake(self.connector.clone(), self.uri.clone(), self.timeout).await?;
        }

        let mut target = leg.url.path().to_string();
        if let Some(query) = leg.url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut builder = http::Request::builder()
            .method(http::Method::from(leg.method))
            .uri(target)
            .header(HOST, self.host.as_str());
        for (name, value) in leg.headers {
            if !name.eq_ignore_ascii_case(HOST.as_str()) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        let request = builder
            .body(Full::new(leg.body.clone()))
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        tokio::time::timeout(self.timeout, self.sender.send_request(request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|err| Error::connection(err.to_string()))
    }
}

async fn handshake(
    connector: HttpsConnector<HttpConnector>,
    uri: http::Uri,
    timeout: Duration,
) -> Result<SendRequest<Full<Bytes>>> {
    let connect = async {
        let io = connector
            .oneshot(uri)
            .await
            .map_err(|err| Error::connection(err.to_string()))?;
        hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|err| Error::connection(err.to_string()))
    };
    let (sender, connection) = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| Error::Timeout)??;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            trace!(%err, "ntlm: connection closed with error");
        }
    });
    Ok(sender)
}
