use std::io::Cursor;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};

use crate::ProbeError;

/// Load certificates from PEM content
pub fn load_certs_from_pem(pem_content: &str) -> Result<Vec<CertificateDer<'static>>, ProbeError> {
    let mut cursor = Cursor::new(pem_content.as_bytes());
    let certs = certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProbeError::Certificate(format!("Failed to parse certificates: {}", e)))?;

    if certs.is_empty() {
        return Err(ProbeError::Certificate(
            "No certificate found in PEM content".to_string(),
        ));
    }
    Ok(certs)
}

/// Load a private key (PKCS#8, PKCS#1 or SEC1) from PEM content
pub fn load_private_key_from_pem(pem_content: &str) -> Result<PrivateKeyDer<'static>, ProbeError> {
    let mut cursor = Cursor::new(pem_content.as_bytes());
    private_key(&mut cursor)
        .map_err(|e| ProbeError::Certificate(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| ProbeError::Certificate("No private key found in PEM content".to_string()))
}

/// Build the server-side TLS config for the probe listener.
///
/// No client certificates are requested. Only HTTP/1.1 is advertised over
/// ALPN since WebSocket upgrades and the SSE stream rely on it.
pub fn load_server_config_from_pem(
    cert_pem: &str,
    key_pem: &str,
) -> Result<ServerConfig, ProbeError> {
    let certs = load_certs_from_pem(cert_pem)?;
    let key = load_private_key_from_pem(key_pem)?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ProbeError::Tls(format!("Failed to build server config: {}", e)))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    tracing::debug!("Server TLS config loaded");
    Ok(config)
}

/// Build a client TLS config that trusts the given CA bundle
pub fn load_client_config_from_pem(ca_pem: &str) -> Result<ClientConfig, ProbeError> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs_from_pem(ca_pem)? {
        root_store.add(cert).map_err(|e| {
            ProbeError::Certificate(format!("Failed to add CA certificate: {}", e))
        })?;
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install_provider() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    #[test]
    fn test_server_config_from_generated_pair() {
        install_provider();
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();

        let config = load_server_config_from_pem(&cert.pem(), &key.serialize_pem()).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_missing_certificate_is_an_error() {
        let result = load_certs_from_pem("not a pem block");
        assert!(matches!(result, Err(ProbeError::Certificate(_))));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let result = load_private_key_from_pem("-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_client_config_trusts_ca() {
        install_provider();
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();

        assert!(load_client_config_from_pem(&cert.pem()).is_ok());
    }
}
