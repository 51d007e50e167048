//! Authorization strategies.
//!
//! A strategy is attached to a request with
//! [`RequestBuilder::with_auth`](crate::RequestBuilder::with_auth). It runs in two phases:
//!
//! 1. [`Authorization::prepare`] performs setup that may need I/O, such as
//!    fetching an `OAuth2` token. It is idempotent.
//! 2. [`Authorization::apply`] mutates the in-flight request through an
//!    [`AuthTarget`]: it adds headers and/or replaces the transport.
//!
//! Strategies are `Send + Sync` and can be shared by many requests.
//!
//! ```ignore
//! use courier::auth::BearerAuth;
//!
//! let auth = BearerAuth::new("my-access-token");
//! let response = courier::get("https://api.example.com/me")
//!     .with_auth(&auth)
//!     .await
//!     .execute()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::future::Future;

use derive_more::{Display, Error, From};

use crate::HyperClient;
use crate::request::{check_header, set_header};

mod any;
mod basic;
mod bearer;
mod cert;
mod header;
mod jwt;
mod ntlm;
mod oauth2;

pub use any::AnyAuth;
pub use basic::BasicAuth;
pub use bearer::BearerAuth;
pub use cert::ClientCertificateAuth;
pub use header::HeaderAuth;
pub use jwt::{JwtAuth, JwtKey};
pub use ntlm::NtlmAuth;
pub use oauth2::{ClientAuthMethod, GrantType, OAuth2Auth, OAuth2Token, OidcDiscovery};

// ============================================================================
// Strategy contract
// ============================================================================

/// An authorization strategy.
pub trait Authorization: Send + Sync {
    /// Acquire or compute whatever `apply` needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be prepared.
    fn prepare(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        async { Ok(()) }
    }

    /// Add credentials to the request being built.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be applied.
    fn apply(
        &self,
        target: &mut AuthTarget<'_>,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// View of an in-flight request handed to [`Authorization::apply`].
#[derive(Debug)]
pub struct AuthTarget<'a> {
    headers: &'a mut HashMap<String, String>,
    client: &'a mut HyperClient,
}

impl<'a> AuthTarget<'a> {
    pub(crate) fn new(headers: &'a mut HashMap<String, String>, client: &'a mut HyperClient) -> Self {
        Self { headers, client }
    }

    /// Set a header, replacing any value stored under the same name in any case.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value cannot be sent on the wire.
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), AuthError> {
        let (name, value) = (name.into(), value.into());
        check_header(&name, &value)?;
        set_header(self.headers, name, value);
        Ok(())
    }

    /// Current header value, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The client the request will be sent with.
    #[must_use]
    pub fn client(&self) -> &HyperClient {
        self.client
    }

    /// Replace the client the request will be sent with.
    pub fn set_transport(&mut self, client: HyperClient) {
        *self.client = client;
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by authorization strategies.
///
/// When raised through `with_auth`, they are recorded as
/// [`Error::Authorization`](crate::Error::Authorization).
#[derive(Debug, Display, Error, From)]
#[non_exhaustive]
pub enum AuthError {
    /// Unknown or unsupported JWT algorithm name.
    #[display("invalid jwt algorithm: {_0}")]
    #[from(skip)]
    InvalidAlgorithm(#[error(not(source))] String),

    /// JWT key loading or signing failure.
    #[display("jwt signing failed: {_0}")]
    #[from]
    Signing(jsonwebtoken::errors::Error),

    /// Token endpoint answered with a status other than 200.
    #[display("unexpected status code: {status} - {body}")]
    #[from(skip)]
    TokenEndpoint {
        /// Response status.
        status: u16,
        /// Response body.
        body: String,
    },

    /// OIDC discovery document rejected.
    #[display("oidc discovery failed: {_0}")]
    #[from(skip)]
    Discovery(#[error(not(source))] String),

    /// The provider does not advertise the grant type.
    #[display("{_0} grant type is not supported by this provider")]
    #[from(skip)]
    UnsupportedGrantType(#[error(not(source))] GrantType),

    /// Grant type without an implementation.
    #[display("grant type not implemented: {_0}")]
    #[from(skip)]
    GrantNotImplemented(#[error(not(source))] GrantType),

    /// Missing mandatory strategy settings.
    #[display("invalid configuration: {_0}")]
    #[from(skip)]
    Configuration(#[error(not(source))] String),

    /// NTLM handshake failure.
    #[display("ntlm negotiation failed: {_0}")]
    #[from(skip)]
    Ntlm(#[error(not(source))] String),

    /// Certificate or key material rejected.
    #[display("certificate error: {_0}")]
    #[from(skip)]
    Certificate(#[error(not(source))] String),

    /// PKCS#12 archive could not be decoded.
    #[display("PKCS#12 error: {_0}")]
    #[from]
    Pkcs12(p12_keystore::error::Error),

    /// TLS configuration rejected.
    #[display("TLS configuration error: {_0}")]
    #[from]
    Tls(rustls::Error),

    /// Request issued by the strategy failed.
    #[display("{_0}")]
    #[from]
    Request(courier_core::Error),

    /// Reading key material failed.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_target_replaces_headers_case_insensitively() {
        let mut headers = HashMap::from([("authorization".to_string(), "old".to_string())]);
        let mut client = HyperClient::new();
        let mut target = AuthTarget::new(&mut headers, &mut client);

        target
            .add_header("Authorization", "Bearer new")
            .expect("valid header");

        assert_eq!(target.header("AUTHORIZATION"), Some("Bearer new"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn auth_target_rejects_unsendable_headers() {
        let mut headers = HashMap::new();
        let mut client = HyperClient::new();
        let mut target = AuthTarget::new(&mut headers, &mut client);

        let err = target.add_header("X-Token", "a\r\nb").expect_err("control characters");
        assert!(matches!(err, AuthError::Request(courier_core::Error::InvalidHeader(_))));
        assert!(target.add_header("Bad Name", "v").is_err());
        assert!(target.header("x-token").is_none());
    }

    #[test]
    fn auth_target_replaces_transport() {
        let mut headers = HashMap::new();
        let mut client = HyperClient::new();
        let replacement = HyperClient::builder().user_agent("replaced/1.0").build();
        let mut target = AuthTarget::new(&mut headers, &mut client);

        target.set_transport(replacement);

        assert_eq!(target.client().config().user_agent, "replaced/1.0");
    }

    #[test]
    fn error_messages() {
        let err = AuthError::InvalidAlgorithm("XX999".to_string());
        assert_eq!(err.to_string(), "invalid jwt algorithm: XX999");

        let err = AuthError::TokenEndpoint {
            status: 400,
            body: "bad request".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected status code: 400 - bad request");

        let err = AuthError::GrantNotImplemented(GrantType::Password);
        assert_eq!(err.to_string(), "grant type not implemented: password");

        let err = AuthError::UnsupportedGrantType(GrantType::ClientCredentials);
        assert_eq!(
            err.to_string(),
            "client_credentials grant type is not supported by this provider"
        );
    }
}
