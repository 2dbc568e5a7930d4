//! Secret resolution for probe server credentials
//!
//! Certificates and private keys are referenced by a small URI syntax and
//! resolved at startup:
//!
//! - **Environment variables** (`env://VAR_NAME`): read from the process environment
//! - **Files** (`file:///path` or just `/path`): read content from the filesystem
//! - **Base64** (`base64://...`): inline base64-encoded content, handy for PEM in env vars
//! - **Plain values**: any string without a URI scheme is taken literally (inline PEM)
//!
//! # Example
//!
//! ```rust,ignore
//! use probe_secrets::{SecretUri, SecretResolver};
//!
//! let uri: SecretUri = "env://PROBE_TLS_CERT".parse()?;
//! let cert_pem = SecretResolver::new().resolve_trimmed(&uri)?;
//! ```
//!
//! # Features
//!
//! - `env` (default): environment variable support
//! - `file` (default): file reading support
//! - `base64` (default): inline base64 support

mod backends;
mod error;
mod resolver;
mod uri;

pub use error::SecretError;
pub use resolver::SecretResolver;
pub use uri::SecretUri;
