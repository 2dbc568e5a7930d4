use thiserror::Error;

/// Common errors for TLS setup and connection handling
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Certificate error: {0}")]
    Certificate(String),
}
