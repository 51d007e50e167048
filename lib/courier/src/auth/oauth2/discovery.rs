use serde::Deserialize;

/// `OpenID` Connect discovery document.
///
/// Missing fields deserialize to empty values; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OidcDiscovery {
    /// Issuer identifier.
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// `UserInfo` endpoint.
    pub userinfo_endpoint: String,
    /// JSON Web Key Set document.
    pub jwks_uri: String,
    /// Dynamic client registration endpoint.
    pub registration_endpoint: String,
    /// Token introspection endpoint.
    pub introspection_endpoint: String,
    /// RP-initiated logout endpoint.
    pub end_session_endpoint: String,
    /// Session management iframe.
    pub check_session_iframe: String,
    /// Supported grant types.
    pub grant_types_supported: Vec<String>,
    /// Supported response types.
    pub response_types_supported: Vec<String>,
    /// Supported claims.
    pub claims_supported: Vec<String>,
    /// Supported scopes.
    pub scopes_supported: Vec<String>,
}

impl OidcDiscovery {
    /// Whether the provider advertises `grant_type`.
    #[must_use]
    pub fn is_grant_type_supported(&self, grant_type: &str) -> bool {
        contains(&self.grant_types_supported, grant_type)
    }

    /// Whether the provider advertises `response_type`.
    #[must_use]
    pub fn is_response_type_supported(&self, response_type: &str) -> bool {
        contains(&self.response_types_supported, response_type)
    }

    /// Whether the provider advertises `claim`.
    #[must_use]
    pub fn is_claim_supported(&self, claim: &str) -> bool {
        contains(&self.claims_supported, claim)
    }

    /// Whether the provider advertises `scope`.
    #[must_use]
    pub fn is_scope_supported(&self, scope: &str) -> bool {
        contains(&self.scopes_supported, scope)
    }
}

fn contains(values: &[String], value: &str) -> bool {
    values.iter().any(|candidate| candidate == value)
}
