//! Bearer token authentication.

use super::{AuthError, AuthTarget, Authorization};

const DEFAULT_PREFIX: &str = "Bearer";

/// Sets `Authorization: <prefix> <token>`, the prefix defaulting to `Bearer`.
///
/// # Example
///
/// ```ignore
/// use courier::auth::BearerAuth;
///
/// let auth = BearerAuth::new("my-access-token");
/// let custom = BearerAuth::new("abc").with_prefix("Token");
/// ```
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
    prefix: String,
}

impl BearerAuth {
    /// Create a bearer strategy for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Use another scheme name. Trailing spaces are ignored, an empty prefix means `Bearer`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{} {}", scheme(&self.prefix), self.token)
    }
}

/// Normalize a token scheme name.
pub(super) fn scheme(prefix: &str) -> &str {
    match prefix.trim_end_matches(' ') {
        "" => DEFAULT_PREFIX,
        prefix => prefix,
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("prefix", &self.prefix)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Authorization for BearerAuth {
    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        target.add_header("Authorization", self.header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix() {
        let auth = BearerAuth::new("my-access-token");
        assert_eq!(auth.header_value(), "Bearer my-access-token");
    }

    #[test]
    fn custom_prefix_is_trimmed() {
        let auth = BearerAuth::new("abc").with_prefix("Token   ");
        assert_eq!(auth.header_value(), "Token abc");

        let auth = BearerAuth::new("abc").with_prefix("   ");
        assert_eq!(auth.header_value(), "Bearer abc");
    }
}
