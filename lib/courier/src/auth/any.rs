//! Strategy selected at runtime.

use derive_more::From;

use super::{
    AuthError, AuthTarget, Authorization, BasicAuth, BearerAuth, ClientCertificateAuth, HeaderAuth,
    JwtAuth, NtlmAuth, OAuth2Auth,
};

/// Any of the built-in strategies.
///
/// [`Authorization`] returns `impl Future`, so it cannot be used as a trait
/// object. Use this enum when the strategy is only known at runtime, for
/// example when it comes from configuration.
///
/// ```ignore
/// use courier::auth::{AnyAuth, BasicAuth, BearerAuth};
///
/// let auth: AnyAuth = match settings.token {
///     Some(token) => BearerAuth::new(token).into(),
///     None => BasicAuth::new(&settings.user, &settings.password).into(),
/// };
/// let response = courier::get(&settings.url).with_auth(&auth).await.execute().await?;
/// ```
#[derive(Debug, From)]
#[non_exhaustive]
pub enum AnyAuth {
    /// HTTP Basic.
    Basic(BasicAuth),
    /// Bearer token.
    Bearer(BearerAuth),
    /// Arbitrary header.
    Header(HeaderAuth),
    /// Signed JWT.
    Jwt(JwtAuth),
    /// NTLM negotiation.
    Ntlm(NtlmAuth),
    /// Mutual TLS.
    ClientCertificate(ClientCertificateAuth),
    /// `OAuth2` client credentials.
    OAuth2(OAuth2Auth),
}

impl Authorization for AnyAuth {
    async fn prepare(&self) -> Result<(), AuthError> {
        match self {
            Self::Basic(auth) => auth.prepare().await,
            Self::Bearer(auth) => auth.prepare().await,
            Self::Header(auth) => auth.prepare().await,
            Self::Jwt(auth) => auth.prepare().await,
            Self::Ntlm(auth) => auth.prepare().await,
            Self::ClientCertificate(auth) => auth.prepare().await,
            Self::OAuth2(auth) => auth.prepare().await,
        }
    }

    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        match self {
            Self::Basic(auth) => auth.apply(target).await,
            Self::Bearer(auth) => auth.apply(target).await,
            Self::Header(auth) => auth.apply(target).await,
            Self::Jwt(auth) => auth.apply(target).await,
            Self::Ntlm(auth) => auth.apply(target).await,
            Self::ClientCertificate(auth) => auth.apply(target).await,
            Self::OAuth2(auth) => auth.apply(target).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;
    use crate::HyperClient;

    fn from_settings(kind: &str) -> AnyAuth {
        match kind {
            "basic" => BasicAuth::new("user", "pass").into(),
            "api-key" => HeaderAuth::new("X-Api-Key", "k-123").into(),
            _ => BearerAuth::new("my-access-token").into(),
        }
    }

    #[tokio::test]
    async fn delegates_to_the_selected_strategy() {
        for (kind, name, value) in [
            ("basic", "Authorization", "Basic dXNlcjpwYXNz"),
            ("api-key", "X-Api-Key", "k-123"),
            ("bearer", "Authorization", "Bearer my-access-token"),
        ] {
            let auth = from_settings(kind);
            let mut headers = HashMap::new();
            let mut client = HyperClient::new();
            let mut target = AuthTarget::new(&mut headers, &mut client);

            let_assert!(Ok(()) = auth.prepare().await);
            let_assert!(Ok(()) = auth.apply(&mut target).await);
            check!(target.header(name) == Some(value), "{kind}");
        }
    }

    #[tokio::test]
    async fn prepare_errors_come_from_the_strategy() {
        let auth = AnyAuth::from(OAuth2Auth::client_credentials("id", "secret"));
        let_assert!(Err(AuthError::Configuration(_)) = auth.prepare().await);
    }
}
