//! Basic authentication.
//!
//! Sets `Authorization: Basic <base64(username:password)>`.

use std::sync::Arc;

use base64::Engine;

use super::{AuthError, AuthTarget, Authorization};

/// HTTP Basic authentication.
///
/// # Example
///
/// ```ignore
/// use courier::auth::BasicAuth;
///
/// let auth = BasicAuth::new("user", "pass");
/// let response = courier::get("https://api.example.com")
///     .with_auth(&auth)
///     .await
///     .execute()
///     .await?;
/// ```
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    /// Base64-encoded "username:password".
    encoded_credentials: Arc<str>,
}

impl BasicAuth {
    /// Create a new basic auth strategy with the given username and password.
    pub fn new(username: impl Into<String>, password: impl AsRef<str>) -> Self {
        let username = username.into();
        let credentials = format!("{username}:{}", password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            username,
            encoded_credentials: Arc::from(encoded),
        }
    }

    /// The user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.encoded_credentials)
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Authorization for BasicAuth {
    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        target.add_header("Authorization", self.header_value())
    }
}
