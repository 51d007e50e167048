//! Mutual TLS client certificate authentication.

use std::path::Path;

use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::RootCertStore;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::debug;

use super::{AuthError, AuthTarget, Authorization};
use crate::connector::tls_config_builder;

/// Presents a client certificate during the TLS handshake.
///
/// Applying the strategy replaces the request transport with one using the
/// certificate; the client configuration and layers are kept.
///
/// # Example
///
/// ```ignore
/// use courier::auth::ClientCertificateAuth;
///
/// let auth = ClientCertificateAuth::from_pem_files("client.crt", "client.key")?
///     .with_ca_certificates_pem(&std::fs::read("ca.crt")?)?;
///
/// let response = courier::get("https://mtls.example.com")
///     .with_auth(&auth)
///     .await
///     .execute()
///     .await?;
/// ```
pub struct ClientCertificateAuth {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    ca_certificates: Option<RootCertStore>,
    insecure_skip_verify: bool,
}

impl ClientCertificateAuth {
    fn new(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, AuthError> {
        if chain.is_empty() {
            return Err(AuthError::Certificate("no certificate found".to_string()));
        }

        // Let rustls check the key before the first request does.
        tls_config_builder(None, false).with_client_auth_cert(chain.clone(), key.clone_key())?;

        Ok(Self {
            chain,
            key,
            ca_certificates: None,
            insecure_skip_verify: false,
        })
    }

    /// Load a PEM certificate chain and PEM private key from files.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or does not hold a usable
    /// certificate or key.
    pub fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, AuthError> {
        let cert = std::fs::read(cert_path)?;
        let key = std::fs::read(key_path)?;
        Self::from_pem(&cert, &key)
    }

    /// Load a PEM certificate chain and PEM private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not hold a usable certificate or key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, AuthError> {
        let chain = parse_pem_certificates(cert_pem)?;
        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|err| AuthError::Certificate(format!("invalid private key: {err}")))?;
        Self::new(chain, key)
    }

    /// Load a PKCS#12 archive from a file.
    ///
    /// # Errors
    ///
    /// Same as [`ClientCertificateAuth::from_pkcs12`], plus I/O errors.
    pub fn from_pkcs12_file(path: impl AsRef<Path>, password: &str) -> Result<Self, AuthError> {
        let data = std::fs::read(path)?;
        Self::from_pkcs12(&data, password)
    }

    /// Load a PKCS#12 archive.
    ///
    /// The first certificate of the key chain is presented to the server; the
    /// rest of the chain and any trusted certificate of the archive replace
    /// the CA pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be decrypted or holds no key.
    pub fn from_pkcs12(data: &[u8], password: &str) -> Result<Self, AuthError> {
        let keystore = KeyStore::from_pkcs12(data, password)?;

        let Some((alias, key_chain)) = keystore.private_key_chain() else {
            return Err(AuthError::Certificate(
                "no private key found in PKCS#12 archive".to_string(),
            ));
        };
        debug!(alias, certificates = key_chain.chain().len(), "loaded PKCS#12 key chain");

        let mut certificates = key_chain
            .chain()
            .iter()
            .map(|cert| CertificateDer::from(cert.as_der().to_vec()));
        let leaf: Vec<_> = certificates.next().into_iter().collect();

        let mut ca = RootCertStore::empty();
        for cert in certificates {
            ca.add(cert)?;
        }
        for (_, entry) in keystore.entries() {
            if let KeyStoreEntry::Certificate(cert) = entry {
                ca.add(CertificateDer::from(cert.as_der().to_vec()))?;
            }
        }

        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_chain.key().to_vec()));
        let auth = Self::new(leaf, key)?;

        Ok(if ca.is_empty() {
            auth
        } else {
            auth.with_ca_certificates(ca)
        })
    }

    /// Trust only `roots` instead of the Mozilla root certificates.
    #[must_use]
    pub fn with_ca_certificates(mut self, roots: RootCertStore) -> Self {
        self.ca_certificates = Some(roots);
        self
    }

    /// Trust only the certificates of a PEM bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle holds no valid certificate.
    pub fn with_ca_certificates_pem(self, pem: &[u8]) -> Result<Self, AuthError> {
        let mut roots = RootCertStore::empty();
        for cert in parse_pem_certificates(pem)? {
            roots.add(cert)?;
        }
        Ok(self.with_ca_certificates(roots))
    }

    /// Skip server certificate verification.
    #[must_use]
    pub fn with_insecure_skip_verify(mut self, insecure_skip_verify: bool) -> Self {
        self.insecure_skip_verify = insecure_skip_verify;
        self
    }

    /// The certificate chain presented to servers.
    #[must_use]
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    /// The CA pool replacing the Mozilla roots, if any.
    #[must_use]
    pub fn ca_certificates(&self) -> Option<&RootCertStore> {
        self.ca_certificates.as_ref()
    }

    fn tls_config(&self) -> Result<rustls::ClientConfig, AuthError> {
        let config = tls_config_builder(self.ca_certificates.clone(), self.insecure_skip_verify)
            .with_client_auth_cert(self.chain.clone(), self.key.clone_key())?;
        Ok(config)
    }
}

fn parse_pem_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, AuthError> {
    let certificates = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| AuthError::Certificate(format!("invalid certificate: {err}")))?;

    if certificates.is_empty() {
        return Err(AuthError::Certificate(
            "no certificate found in PEM data".to_string(),
        ));
    }
    Ok(certificates)
}

impl Clone for ClientCertificateAuth {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
            ca_certificates: self.ca_certificates.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
        }
    }
}

impl std::fmt::Debug for ClientCertificateAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificateAuth")
            .field("certificates", &self.chain.len())
            .field("key", &"[REDACTED]")
            .field(
                "ca_certificates",
                &self.ca_certificates.as_ref().map(RootCertStore::len),
            )
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl Authorization for ClientCertificateAuth {
    async fn apply(&self, target: &mut AuthTarget<'_>) -> Result<(), AuthError> {
        let config = self.tls_config()?;
        let client = target.client().with_tls(config, false);
        target.set_transport(client);
        Ok(())
    }
}
