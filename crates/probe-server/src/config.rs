//! Probe server configuration
//!
//! Values are resolved in this order (first found wins):
//! 1. Command-line flags
//! 2. Environment variables (PROBE_*, plus the legacy ADDRESS)
//! 3. Config file (probe.toml)
//! 4. Default values

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use probe_secrets::SecretUri;
use serde::Deserialize;

use crate::address::ListenAddress;
use crate::credentials::CredentialSource;
use crate::duration::parse_duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "PROBE";

/// Interval between SSE events when the request does not ask for one
pub const DEFAULT_SSE_INTERVAL: Duration = Duration::from_millis(10_000);

/// Name shown on the echo page when nothing else is configured
pub const DEFAULT_SERVER_NAME: &str = "the tunnel probe server";

/// Settings the request dispatcher is constructed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub default_sse_interval: Duration,
    pub server_name: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            default_sse_interval: DEFAULT_SSE_INTERVAL,
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

/// Server configuration as written in the TOML file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (`host:port`, `host:`, or `:port`)
    pub address: Option<String>,

    /// Certificate (file path, env://, base64://, or inline PEM)
    #[serde(alias = "cert_path")]
    pub cert: Option<String>,

    /// Private key (file path, env://, base64://, or inline PEM)
    #[serde(alias = "key_path")]
    pub key: Option<String>,

    /// Default SSE interval, e.g. "10s"
    pub sse_interval: Option<String>,

    /// Name shown on the echo page
    pub server_name: Option<String>,
}

/// Values given on the command line; they beat everything else
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub sse_interval: Option<String>,
}

/// Fully resolved configuration, ready to start the server
#[derive(Debug)]
pub struct ResolvedServerConfig {
    pub address: ListenAddress,
    pub credentials: CredentialSource,
    pub probe: ProbeConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file (optional)
    pub fn load(path: &str) -> Self {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Resolve against the process environment
    pub fn resolve(self, overrides: ConfigOverrides) -> anyhow::Result<ResolvedServerConfig> {
        self.resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<F>(
        self,
        overrides: ConfigOverrides,
        env: F,
    ) -> anyhow::Result<ResolvedServerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefixed = |name: &str| env(&format!("{}_{}", ENV_PREFIX, name));

        // Address: CLI > PROBE_ADDRESS > ADDRESS > config > "localhost:"
        let address_source = overrides
            .address
            .or_else(|| prefixed("ADDRESS"))
            .or_else(|| env("ADDRESS"))
            .or(self.address)
            .unwrap_or_default();
        let address: ListenAddress = address_source
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", address_source))?;

        // Certificate and key: CLI > ENV > ENV_FILE > config
        let cert_source = overrides
            .cert
            .or_else(|| prefixed("CERT"))
            .or_else(|| prefixed("CERT_FILE").map(|f| format!("file://{}", f)))
            .or(self.cert);
        let key_source = overrides
            .key
            .or_else(|| prefixed("KEY"))
            .or_else(|| prefixed("KEY_FILE").map(|f| format!("file://{}", f)))
            .or(self.key);

        let credentials = match (cert_source, key_source) {
            (Some(cert), Some(key)) => {
                let cert: SecretUri = cert
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid certificate source: {}", e))?;
                let key: SecretUri = key
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid key source: {}", e))?;
                CredentialSource::Secrets { cert, key }
            }
            (None, None) => CredentialSource::SelfSigned,
            (Some(_), None) => anyhow::bail!(
                "Certificate configured without a private key. Set PROBE_KEY, PROBE_KEY_FILE, or key in config"
            ),
            (None, Some(_)) => anyhow::bail!(
                "Private key configured without a certificate. Set PROBE_CERT, PROBE_CERT_FILE, or cert in config"
            ),
        };

        // SSE interval: CLI > ENV > config > 10s
        let default_sse_interval = match overrides
            .sse_interval
            .or_else(|| prefixed("SSE_INTERVAL"))
            .or(self.sse_interval)
        {
            Some(value) => parse_duration(&value).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid SSE interval '{}'. Use <digits>ms, <digits>s or <digits>m",
                    value
                )
            })?,
            None => DEFAULT_SSE_INTERVAL,
        };

        // Server name: ENV > HOSTNAME > config > default
        let server_name = prefixed("SERVER_NAME")
            .or_else(|| env("HOSTNAME"))
            .or(self.server_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        Ok(ResolvedServerConfig {
            address,
            credentials,
            probe: ProbeConfig {
                default_sse_interval,
                server_name,
            },
        })
    }

    /// Load config file and resolve with environment and CLI overrides
    pub fn load_and_resolve(
        path: &str,
        overrides: ConfigOverrides,
    ) -> anyhow::Result<ResolvedServerConfig> {
        Self::load(path).resolve(overrides)
    }
}
