use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// Token issued by an `OAuth2` token endpoint.
///
/// `Deserialize`-only: tokens are never serialized back out.
#[derive(Clone, Default, Deserialize)]
pub struct OAuth2Token {
    /// The access token.
    #[serde(default)]
    pub access_token: String,
    /// Token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: String,
    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: String,
    /// Refresh token, when issued.
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime in seconds, as reported by the server.
    #[serde(default)]
    pub expires_in: u64,
    /// Expiry as unix seconds.
    #[serde(default)]
    pub expires_at: u64,
}

impl OAuth2Token {
    /// `true` once the current time reaches `expires_at`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    /// `true` once `now` (unix seconds) reaches `expires_at`.
    #[must_use]
    pub const fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// `Authorization` header value: `<token_type or Bearer> <access_token>`.
    #[must_use]
    pub fn authorization_value(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{token_type} {}", self.access_token)
    }

    /// Derive `expires_at` when the server did not send it.
    pub(super) fn fill_expiry(&mut self, now: u64, default_ttl: Duration) {
        if self.expires_at != 0 {
            return;
        }
        let lifetime = if self.expires_in == 0 {
            default_ttl.as_secs()
        } else {
            self.expires_in
        };
        self.expires_at = now.saturating_add(lifetime);
    }
}

impl std::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub(super) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
