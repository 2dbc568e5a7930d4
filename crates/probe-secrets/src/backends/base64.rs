//! Inline base64 backend

use base64::Engine;

use crate::error::SecretError;

/// Decode an inline base64 secret into UTF-8 text
pub fn resolve(data: &str) -> Result<String, SecretError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| SecretError::backend("base64", format!("decode error: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| SecretError::backend("base64", format!("invalid UTF-8: {}", e)))
}
