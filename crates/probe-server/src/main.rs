use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use probe_server::{tls_acceptor, ConfigOverrides, CredentialSource, ProbeServer, ServerConfig};

/// Probe server - checks HTTP, WebSocket and SSE traffic through a tunnel
#[derive(Parser, Debug)]
#[command(name = "probe-server")]
#[command(about = "TLS test server for verifying tunnel forwarding")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "probe.toml")]
    config: String,

    /// Listen address (host:port, host:, or :port)
    #[arg(short, long)]
    address: Option<String>,

    /// Server certificate (file path, env://, base64://, or inline PEM)
    #[arg(long)]
    cert: Option<String>,

    /// Server private key (file path, env://, base64://, or inline PEM)
    #[arg(long)]
    key: Option<String>,

    /// Default SSE interval when a request has no `freq` (e.g. 10s, 500ms)
    #[arg(long)]
    sse_interval: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("probe_server=info".parse()?)
                .add_directive("probe_common=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let overrides = ConfigOverrides {
        address: args.address,
        cert: args.cert,
        key: args.key,
        sse_interval: args.sse_interval,
    };
    let config = ServerConfig::load_and_resolve(&args.config, overrides)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    tracing::info!("Listen address: {}", config.address);
    tracing::info!("Default SSE interval: {:?}", config.probe.default_sse_interval);

    let provider = config.credentials.provider();
    match &config.credentials {
        CredentialSource::Secrets { cert, key } => tracing::info!(
            "TLS: certificate from {}, key from {}",
            cert.backend_name(),
            key.backend_name()
        ),
        CredentialSource::SelfSigned => {
            tracing::info!("TLS: no certificate configured, generating a self-signed one")
        }
    }
    let acceptor =
        tls_acceptor(provider.as_ref()).context("Failed to load TLS configuration")?;

    let listener = ProbeServer::bind(&config.address).await?;
    let server = ProbeServer::new(config.probe, acceptor);

    server.run_with_listener(listener, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}
