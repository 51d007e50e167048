//! `OAuth2` client-credentials authentication.
//!
//! Tokens are fetched on `prepare` and cached until they expire. The cache
//! is guarded by an async mutex, so concurrent requests sharing a strategy
//! trigger a single token request.

use std::collections::BTreeMap;
use std::time::Duration;

use derive_more::Display;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{AuthError, AuthTarget, Authorization, BasicAuth};
use crate::HyperClient;

mod discovery;
mod token;

pub use discovery::OidcDiscovery;
pub use token::OAuth2Token;

use token::unix_now;

/// Token lifetime assumed when the server reports none.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// `OAuth2` grant types.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum GrantType {
    /// Authorization code grant.
    #[display("authorization_code")]
    AuthorizationCode,
    /// Resource owner password credentials grant.
    #[display("password")]
    Password,
    /// Client credentials grant.
    #[default]
    #[display("client_credentials")]
    ClientCredentials,
    /// Device authorization grant.
    #[display("device_code")]
    DeviceCode,
}

/// How the client authenticates to the token endpoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic base64(client_id:client_secret)`.
    #[default]
    Basic,
    /// `client_id` and `client_secret` as form fields.
    Form,
}

#[derive(Debug, Default)]
struct State {
    token: Option<OAuth2Token>,
    discovery: Option<OidcDiscovery>,
    token_url: Option<String>,
}

/// Acquires a token with the client-credentials grant and sets
/// `Authorization: <token_type> <access_token>`.
///
/// The token endpoint is either configured directly or found through OIDC
/// discovery.
///
/// # Example
///
/// ```ignore
/// use courier::auth::{ClientAuthMethod, OAuth2Auth};
///
/// let auth = OAuth2Auth::client_credentials("my-client", "my-secret")
///     .with_discovery_url("https://id.example.com/.well-known/openid-configuration")
///     .with_scopes(["read", "write"])
///     .with_auth_method(ClientAuthMethod::Form);
///
/// let response = courier::get("https://api.example.com/items")
///     .with_auth(&auth)
///     .await
///     .execute()
///     .await?;
/// ```
pub struct OAuth2Auth {
    grant_type: GrantType,
    client_id: String,
    client_secret: String,
    auth_method: ClientAuthMethod,
    scopes: Vec<String>,
    discovery_url: Option<String>,
    token_url: Option<String>,
    additional_body_fields: BTreeMap<String, String>,
    default_ttl: Duration,
    client: HyperClient,
    state: Mutex<State>,
}

impl OAuth2Auth {
    /// Create a client-credentials strategy.
    pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            grant_type: GrantType::ClientCredentials,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_method: ClientAuthMethod::default(),
            scopes: Vec::new(),
            discovery_url: None,
            token_url: None,
            additional_body_fields: BTreeMap::new(),
            default_ttl: DEFAULT_TTL,
            client: HyperClient::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Select another grant type. Only client credentials can acquire tokens.
    #[must_use]
    pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant_type = grant_type;
        self
    }

    /// Full URL of the OIDC discovery document.
    #[must_use]
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = Some(url.into());
        self
    }

    /// Token endpoint; skips discovery.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Requested scopes, sent space separated.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// How client credentials are sent.
    #[must_use]
    pub fn with_auth_method(mut self, auth_method: ClientAuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Extra form field sent to the token endpoint, such as `audience`.
    #[must_use]
    pub fn with_body_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_body_fields.insert(name.into(), value.into());
        self
    }

    /// Lifetime assumed when the server reports no expiry. Defaults to 5 minutes.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Client used for discovery and token requests.
    #[must_use]
    pub fn with_client(mut self, client: HyperClient) -> Self {
        self.client = client;
        self
    }

    /// The cached token, if any.
    pub async fn token(&self) -> Option<OAuth2Token> {
        self.state.lock().await.token.clone()
    }

    /// `true` when no token is cached or the cached one has expired.
    pub async fn token_expired(&self) -> bool {
        self.state
            .lock()
            .await
            .token
            .as_ref()
            .is_none_or(OAuth2Token::is_expired)
    }

    /// The discovery document, once fetched.
    pub async fn discovery(&self) -> Option<OidcDiscovery> {
        self.state.lock().await.discovery.clone()
    }

    fn check_configuration(&self) -> Result<(), AuthError> {
        if self.grant_type != GrantType::ClientCredentials {
            return Err(AuthError::GrantNotImplemented(self.grant_type));
        }
        if self.client_id.is_empty()
            || self.client_secret.is_empty()
            || (self.discovery_url.is_none() && self.token_url.is_none())
        {
            return Err(AuthError::Configuration(
                "client_id, client_secret and a discovery_url or token_url are required".to_string(),
            ));
        }
        Ok(())
    }

    async fn token_url(&self, state: &mut State) -> Result<String, AuthError> {
        if let Some(url) = self.token_url.as_ref().or(state.token_url.as_ref()) {
            return Ok(url.clone());
        }
        let Some(discovery_url) = &self.discovery_url else {
            return Err(AuthError::Configuration("missing token url".to_string()));
        };

        debug!(url = %discovery_url, "fetching oidc discovery document");
        let mut response = self.client.get(discovery_url).execute().await?;
        if !response.is_success() {
            return Err(AuthError::Discovery(format!(
                "unexpected status code: {}",
                response.status()
            )));
        }
        let discovery: OidcDiscovery = response.json().await?;

        if !discovery.is_grant_type_supported(&GrantType::ClientCredentials.to_string()) {
            return Err(AuthError::UnsupportedGrantType(GrantType::ClientCredentials));
        }
        if discovery.token_endpoint.is_empty() {
            return Err(AuthError::Discovery("missing token_endpoint".to_string()));
        }

        let url = discovery.token_endpoint.clone();
        state.token_url = Some(url.clone());
        state.discovery = Some(discovery);
        Ok(url)
    }

    async fn acquire(&self, state: &mut State) -> Result<(), AuthError> {
        self.check_configuration()?;
        let token_url = self.token_url(state).await?;

        let mut form = BTreeMap::new();
        form.insert("grant_type".to_string(), self.grant_type.to_string());
        if self.auth_method == ClientAuthMethod::Form {
            form.insert("client_id".to_string(), self.client_id.clone());
            form.insert("client_secret".to_string(), self.client_secret.clone());
        }
        if !self.scopes.is_empty() {
            form.insert("scope".to_string(), self.scopes.join(" "));
        }
        form.extend(self.additional_body_fields.clone());

        let mut request = self.client.post(&token_url).with_urlencoded_form_body(&form);
        if self.auth_method == ClientAuthMethod::Basic {
            request = request
                .with_auth(&BasicAuth::new(&self.client_id, &self.client_secret))
                .await;
        }

        debug!(url = %token_url, client_id = %self.client_id, "requesting oauth2 token");
        let mut response = request.execute().await?;
        if response.status() != 200 {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint { status, body });
        }

        let mut token: OAuth2Token = response.json().await?;
        token.fill_expiry(unix_now(), self.default_ttl);
        info!(
            client_id = %self.client_id,
            expires_at = token.expires_at,
            "acquired oauth2 token"
        );
        state.token = Some(token);
        Ok(())
    }

    async fn live_state(&self) -> Result<MutexGuard<'_, State>, AuthError> {
        let mut state = self.state.lock().await;
        let live = state
            .token
            .as_ref()
            .is_some_and(|token| !token.access_token.is_empty() && !token.is_expired());
        if !live {
            self.acquire(&mut state).await?;
        }
        Ok(state)
    }
}

impl std::fmt::Debug for OAuth2Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Auth")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .field("scopes", &self.scopes)
            .field("discovery_url", &self.discovery_url)
            .field("token_url", &self.token_url)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl Authorization for OAuth2Auth {
    async fn prepare(&self) -> Result<(), AuthError> {
        self.live_state().await.map(drop)
    }

    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        let state = self.live_state().await?;
        let Some(token) = state.token.as_ref() else {
            return Err(AuthError::Configuration("no token acquired".to_string()));
        };
        target.add_header("Authorization", token.authorization_value())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn grant_type_names() {
        check!(GrantType::AuthorizationCode.to_string() == "authorization_code");
        check!(GrantType::Password.to_string() == "password");
        check!(GrantType::ClientCredentials.to_string() == "client_credentials");
        check!(GrantType::DeviceCode.to_string() == "device_code");
        check!(ClientAuthMethod::default() == ClientAuthMethod::Basic);
    }

    #[tokio::test]
    async fn other_grants_are_not_implemented() {
        let auth = OAuth2Auth::client_credentials("id", "secret")
            .with_token_url("http://127.0.0.1:9/token")
            .with_grant_type(GrantType::DeviceCode);
        let_assert!(Err(err) = auth.prepare().await);
        check!(err.to_string() == "grant type not implemented: device_code");
    }

    #[tokio::test]
    async fn requires_credentials_and_endpoint() {
        let auth = OAuth2Auth::client_credentials("id", "secret");
        let_assert!(Err(AuthError::Configuration(_)) = auth.prepare().await);

        let auth = OAuth2Auth::client_credentials("", "secret").with_token_url("http://127.0.0.1:9/token");
        let_assert!(Err(AuthError::Configuration(_)) = auth.prepare().await);
    }

    #[tokio::test]
    async fn no_token_before_prepare() {
        let auth = OAuth2Auth::client_credentials("id", "secret");
        check!(auth.token().await.is_none());
        check!(auth.token_expired().await);
        check!(auth.discovery().await.is_none());
    }

    #[test]
    fn debug_hides_secret() {
        let auth = OAuth2Auth::client_credentials("id", "hunter2");
        check!(!format!("{auth:?}").contains("hunter2"));
    }
}
