//! Arbitrary header authentication, such as API keys.

use super::{AuthError, AuthTarget, Authorization};

/// Sets one header verbatim.
///
/// ```ignore
/// use courier::auth::HeaderAuth;
///
/// let auth = HeaderAuth::new("X-Api-Key", "secret");
/// ```
#[derive(Clone)]
pub struct HeaderAuth {
    name: String,
    value: String,
}

impl HeaderAuth {
    /// Create a strategy setting `name: value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for HeaderAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderAuth")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Authorization for HeaderAuth {
    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        target.add_header(self.name.clone(), self.value.clone())
    }
}
