use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving a secret
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Invalid secret URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Backend feature not compiled in
    #[error("Secret backend '{backend}' not available (feature not enabled)")]
    BackendDisabled { backend: String },

    #[error("{backend} error: {message}")]
    BackendError { backend: String, message: String },

    #[error("Failed to read file '{path}': {message}")]
    FileError { path: PathBuf, message: String },

    #[error("Environment variable '{var}' not set")]
    EnvNotSet { var: String },

    /// The backend answered, but with nothing usable
    #[error("Secret from {backend} backend is empty")]
    Empty { backend: String },
}

impl SecretError {
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn disabled(backend: impl Into<String>) -> Self {
        Self::BackendDisabled {
            backend: backend.into(),
        }
    }
}
