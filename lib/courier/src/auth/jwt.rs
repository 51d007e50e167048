//! JWT signing authentication.
//!
//! The token is signed on every `apply`, so time-based claims set by the
//! caller are used as given.

use std::sync::{Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{Map, Value};
use tracing::debug;

use super::bearer::scheme;
use super::{AuthError, AuthTarget, Authorization};

/// Key material used to sign a JWT.
#[derive(Clone)]
pub enum JwtKey {
    /// HMAC secret for the `HS*` algorithms.
    Secret(Vec<u8>),
    /// PEM encoded RSA private key for the `RS*` and `PS*` algorithms.
    RsaPem(Vec<u8>),
    /// PEM encoded EC private key for the `ES*` algorithms.
    EcPem(Vec<u8>),
    /// PEM encoded Ed25519 private key for `EdDSA`.
    EdPem(Vec<u8>),
}

impl JwtKey {
    fn encoding_key(&self) -> Result<EncodingKey, AuthError> {
        let key = match self {
            Self::Secret(secret) => EncodingKey::from_secret(secret),
            Self::RsaPem(pem) => EncodingKey::from_rsa_pem(pem)?,
            Self::EcPem(pem) => EncodingKey::from_ec_pem(pem)?,
            Self::EdPem(pem) => EncodingKey::from_ed_pem(pem)?,
        };
        Ok(key)
    }
}

impl std::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Secret(_) => "Secret",
            Self::RsaPem(_) => "RsaPem",
            Self::EcPem(_) => "EcPem",
            Self::EdPem(_) => "EdPem",
        };
        f.debug_tuple(kind).field(&"[REDACTED]").finish()
    }
}

/// Header and claims, encoded and ready to be signed.
#[derive(Debug, Clone)]
struct SigningInput {
    algorithm: Algorithm,
    message: String,
}

/// Signs a JWT from the given claims and sets `Authorization: <prefix> <token>`.
///
/// Supported algorithms: `HS256`, `HS384`, `HS512`, `RS256`, `RS384`,
/// `RS512`, `PS256`, `PS384`, `PS512`, `ES256`, `ES384` and `EdDSA`.
///
/// # Example
///
/// ```ignore
/// use courier::auth::{JwtAuth, JwtKey};
/// use serde_json::json;
///
/// let auth = JwtAuth::new("HS256", JwtKey::Secret(b"secret".to_vec()))
///     .with_claims(json!({"sub": "alice", "exp": 1_900_000_000}))
///     .with_header_field("kid", "key-1");
/// ```
#[derive(Debug)]
pub struct JwtAuth {
    algorithm: String,
    key: JwtKey,
    claims: Value,
    additional_headers: Map<String, Value>,
    prefix: String,
    prepared: Mutex<Option<SigningInput>>,
}

impl JwtAuth {
    /// Create a strategy signing with `algorithm` and `key`.
    ///
    /// The algorithm name is checked by [`Authorization::prepare`].
    pub fn new(algorithm: impl Into<String>, key: JwtKey) -> Self {
        Self {
            algorithm: algorithm.into(),
            key,
            claims: Value::Object(Map::new()),
            additional_headers: Map::new(),
            prefix: String::new(),
            prepared: Mutex::new(None),
        }
    }

    /// Replace the claims.
    #[must_use]
    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = claims;
        self.invalidate();
        self
    }

    /// Set a single claim, turning the claims into an object if needed.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.claims.is_object() {
            self.claims = Value::Object(Map::new());
        }
        if let Value::Object(claims) = &mut self.claims {
            claims.insert(name.into(), value.into());
        }
        self.invalidate();
        self
    }

    /// Add a field to the JOSE header, such as `kid`.
    #[must_use]
    pub fn with_header_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_headers.insert(name.into(), value.into());
        self.invalidate();
        self
    }

    /// Use another scheme name than `Bearer` in the `Authorization` header.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn invalidate(&mut self) {
        *self
            .prepared
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn signing_input(&self) -> Result<SigningInput, AuthError> {
        let algorithm: Algorithm = self
            .algorithm
            .parse()
            .map_err(|_| AuthError::InvalidAlgorithm(self.algorithm.clone()))?;

        let mut header = Map::new();
        header.insert("alg".to_string(), Value::from(self.algorithm.as_str()));
        header.insert("typ".to_string(), Value::from("JWT"));
        header.extend(self.additional_headers.clone());

        let header = serde_json::to_vec(&header).map_err(courier_core::Error::from)?;
        let claims = serde_json::to_vec(&self.claims).map_err(courier_core::Error::from)?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        Ok(SigningInput { algorithm, message })
    }

    fn prepared(&self) -> Result<SigningInput, AuthError> {
        let mut prepared = self.prepared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(input) = prepared.as_ref() {
            return Ok(input.clone());
        }

        let input = self.signing_input()?;
        *prepared = Some(input.clone());
        Ok(input)
    }

    /// Sign a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAlgorithm`] for an unknown algorithm name and
    /// [`AuthError::Signing`] if the key does not fit the algorithm.
    pub fn token(&self) -> Result<String, AuthError> {
        let input = self.prepared()?;
        let key = self.key.encoding_key()?;
        let signature = jsonwebtoken::crypto::sign(input.message.as_bytes(), &key, input.algorithm)?;
        Ok(format!("{}.{signature}", input.message))
    }
}

impl Authorization for JwtAuth {
    async fn prepare(&self) -> Result<(), AuthError> {
        let input = self.signing_input()?;
        debug!(algorithm = ?input.algorithm, "prepared jwt signing input");
        *self.prepared.lock().unwrap_or_else(PoisonError::into_inner) = Some(input);
        Ok(())
    }

    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        let token = self.token()?;
        target.add_header("Authorization", format!("{} {token}", scheme(&self.prefix)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
    use serde_json::json;

    use super::*;

    fn hs256() -> JwtAuth {
        JwtAuth::new("HS256", JwtKey::Secret(b"secret".to_vec()))
            .with_claims(json!({"sub": "alice", "admin": true}))
    }

    #[tokio::test]
    async fn rejects_unknown_algorithm() {
        let auth = JwtAuth::new("XX999", JwtKey::Secret(b"secret".to_vec()));
        let_assert!(Err(err) = auth.prepare().await);
        check!(err.to_string() == "invalid jwt algorithm: XX999");
    }

    #[tokio::test]
    async fn es512_is_not_available() {
        let auth = JwtAuth::new("ES512", JwtKey::Secret(b"secret".to_vec()));
        let_assert!(Err(AuthError::InvalidAlgorithm(name)) = auth.prepare().await);
        check!(name == "ES512");
    }

    #[test]
    fn hs256_token_verifies() {
        let token = hs256().token().expect("signed token");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let decoded = decode::<Value>(&token, &DecodingKey::from_secret(b"secret"), &validation)
            .expect("valid signature");

        check!(decoded.claims == json!({"sub": "alice", "admin": true}));
    }

    #[test]
    fn additional_header_fields() {
        let token = hs256()
            .with_header_field("kid", "key-1")
            .token()
            .expect("signed token");

        let header = decode_header(&token).expect("header");
        check!(header.kid.as_deref() == Some("key-1"));
        check!(header.alg == Algorithm::HS256);
    }

    #[test]
    fn key_must_match_algorithm() {
        let auth = JwtAuth::new("RS256", JwtKey::Secret(b"secret".to_vec()));
        let_assert!(Err(AuthError::Signing(_)) = auth.token());
    }

    #[test]
    fn claims_can_be_set_one_by_one() {
        let token = JwtAuth::new("HS384", JwtKey::Secret(b"secret".to_vec()))
            .with_claim("sub", "bob")
            .with_claim("n", 3)
            .token()
            .expect("signed token");

        let mut validation = Validation::new(Algorithm::HS384);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let decoded = decode::<Value>(&token, &DecodingKey::from_secret(b"secret"), &validation)
            .expect("valid signature");
        check!(decoded.claims == json!({"sub": "bob", "n": 3}));
    }

    #[test]
    fn debug_hides_key() {
        let debug = format!("{:?}", hs256());
        check!(!debug.contains("secret"));
    }
}
