//! TLS bootstrap: turns certificate/key material into an acceptor

use std::sync::Arc;

use probe_common::ProbeError;
use probe_secrets::{SecretError, SecretResolver, SecretUri};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to resolve {what}: {source}")]
    Secret {
        what: &'static str,
        #[source]
        source: SecretError,
    },

    #[error("Failed to generate self-signed certificate: {0}")]
    Generate(String),

    #[error(transparent)]
    Tls(#[from] ProbeError),
}

/// A certificate chain and private key, both PEM encoded
#[derive(Clone)]
pub struct TlsCredentials {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("cert_pem", &format!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Anything that can hand over a certificate and key for the listener
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<TlsCredentials, CredentialError>;
}

impl CredentialProvider for TlsCredentials {
    fn credentials(&self) -> Result<TlsCredentials, CredentialError> {
        Ok(self.clone())
    }
}

/// Credentials referenced by secret URIs (files, env vars, base64, inline PEM)
#[derive(Debug, Clone)]
pub struct SecretCredentials {
    cert: SecretUri,
    key: SecretUri,
}

impl SecretCredentials {
    pub fn new(cert: SecretUri, key: SecretUri) -> Self {
        Self { cert, key }
    }
}

impl CredentialProvider for SecretCredentials {
    fn credentials(&self) -> Result<TlsCredentials, CredentialError> {
        let resolver = SecretResolver::new();

        let cert_pem = resolver
            .resolve_trimmed(&self.cert)
            .map_err(|source| CredentialError::Secret {
                what: "certificate",
                source,
            })?;
        let key_pem = resolver
            .resolve_trimmed(&self.key)
            .map_err(|source| CredentialError::Secret {
                what: "private key",
                source,
            })?;

        Ok(TlsCredentials { cert_pem, key_pem })
    }
}

/// A freshly generated self-signed certificate, used when nothing is configured
#[derive(Debug, Clone)]
pub struct SelfSignedCredentials {
    names: Vec<String>,
}

impl SelfSignedCredentials {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Default for SelfSignedCredentials {
    fn default() -> Self {
        Self::new(vec![
            "localhost".to_string(),
            "127.0.0.1".to_string(),
            "::1".to_string(),
        ])
    }
}

impl CredentialProvider for SelfSignedCredentials {
    fn credentials(&self) -> Result<TlsCredentials, CredentialError> {
        let key = KeyPair::generate().map_err(|e| CredentialError::Generate(e.to_string()))?;

        let mut params = CertificateParams::new(self.names.clone())
            .map_err(|e| CredentialError::Generate(e.to_string()))?;
        params.distinguished_name = {
            let mut dn = DistinguishedName::new();
            dn.push(DnType::CommonName, "Probe self-signed");
            dn
        };

        let cert = params
            .self_signed(&key)
            .map_err(|e| CredentialError::Generate(e.to_string()))?;

        Ok(TlsCredentials {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        })
    }
}

/// Where the listener's credentials come from, as decided by configuration
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Secrets { cert: SecretUri, key: SecretUri },
    SelfSigned,
}

impl CredentialSource {
    pub fn provider(&self) -> Box<dyn CredentialProvider> {
        match self {
            CredentialSource::Secrets { cert, key } => {
                Box::new(SecretCredentials::new(cert.clone(), key.clone()))
            }
            CredentialSource::SelfSigned => Box::new(SelfSignedCredentials::default()),
        }
    }
}

/// Build the TLS acceptor for the listener from a credential provider
pub fn tls_acceptor(provider: &dyn CredentialProvider) -> Result<TlsAcceptor, CredentialError> {
    let TlsCredentials { cert_pem, key_pem } = provider.credentials()?;
    let config = probe_common::load_server_config_from_pem(&cert_pem, &key_pem)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}
