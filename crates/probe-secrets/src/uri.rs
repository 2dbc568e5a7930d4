use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::SecretError;

/// Where a secret lives.
///
/// Supported forms:
/// - `env://VAR_NAME` - environment variable
/// - `file:///path/to/file`, or a bare path - file content
/// - `base64://...` - inline base64-encoded content
/// - anything else - the literal value (e.g. an inline PEM block)
#[derive(Debug, Clone, PartialEq)]
pub enum SecretUri {
    Plain(String),

    Env { var_name: String },

    File { path: PathBuf },

    Base64 { data: String },
}

impl SecretUri {
    pub fn is_plain(&self) -> bool {
        matches!(self, SecretUri::Plain(_))
    }

    /// Backend name for logging and errors. Never includes the secret itself.
    pub fn backend_name(&self) -> &'static str {
        match self {
            SecretUri::Plain(_) => "plain",
            SecretUri::Env { .. } => "env",
            SecretUri::File { .. } => "file",
            SecretUri::Base64 { .. } => "base64",
        }
    }
}

impl FromStr for SecretUri {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(var_name) = s.strip_prefix("env://") {
            if var_name.is_empty() {
                return Err(SecretError::invalid_uri(
                    s,
                    "env URI must specify a variable name",
                ));
            }
            Ok(SecretUri::Env {
                var_name: var_name.to_string(),
            })
        } else if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(SecretError::invalid_uri(s, "file URI must specify a path"));
            }
            Ok(SecretUri::File {
                path: PathBuf::from(path),
            })
        } else if let Some(data) = s.strip_prefix("base64://") {
            if data.is_empty() {
                return Err(SecretError::invalid_uri(s, "base64 URI has no content"));
            }
            Ok(SecretUri::Base64 {
                data: data.to_string(),
            })
        } else if looks_like_file_path(s) {
            Ok(SecretUri::File {
                path: PathBuf::from(s),
            })
        } else {
            Ok(SecretUri::Plain(s.to_string()))
        }
    }
}

/// Inline PEM is never a path, even though it may contain ".key"-like text.
fn looks_like_file_path(s: &str) -> bool {
    if s.contains("-----BEGIN") || s.contains('\n') {
        return false;
    }
    s.starts_with('/')
        || s.starts_with("./")
        || s.starts_with("../")
        || (s.len() > 2 && s.chars().nth(1) == Some(':'))
        || s.ends_with(".pem")
        || s.ends_with(".crt")
        || s.ends_with(".key")
}

impl<'de> Deserialize<'de> for SecretUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SecretUri::from_str(&s).map_err(serde::de::Error::custom)
    }
}
