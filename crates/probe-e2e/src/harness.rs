//! Test server harness for E2E tests
//!
//! Starts a complete probe server on `127.0.0.1:0` with freshly generated
//! certificates.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::WebSocketStream;

use probe_server::{tls_acceptor, ListenAddress, ProbeConfig, ProbeServer, TlsCredentials};

use crate::certificates::TestCertificates;

/// A running probe server instance
pub struct TestServer {
    /// Address the listener actually bound
    pub addr: SocketAddr,
    /// Certificate set used
    pub certs: Arc<TestCertificates>,
    /// Shutdown signal sender
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with the default configuration
    pub async fn start() -> Self {
        Self::start_with(ProbeConfig::default()).await
    }

    pub async fn start_with(config: ProbeConfig) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let certs = Arc::new(TestCertificates::generate());
        let credentials = TlsCredentials {
            cert_pem: certs.server_cert_pem.clone(),
            key_pem: certs.server_key_pem.clone(),
        };
        let acceptor = tls_acceptor(&credentials).expect("Failed to load server TLS config");

        let address: ListenAddress = "127.0.0.1:0".parse().expect("valid listen address");
        let listener = ProbeServer::bind(&address)
            .await
            .expect("Failed to bind probe server");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = ProbeServer::new(config, acceptor);
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.run_with_listener(listener, shutdown).await {
                tracing::error!("Probe server error: {}", e);
            }
        });

        Self {
            addr,
            certs,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// URL for a path on this server, e.g. `https://localhost:1234/_health`
    pub fn url(&self, path_and_query: &str) -> String {
        format!("https://localhost:{}{}", self.addr.port(), path_and_query)
    }

    /// HTTP client that trusts the test CA and resolves `localhost` to the
    /// bound address
    pub fn http_client(&self) -> reqwest::Client {
        let ca = reqwest::Certificate::from_pem(self.certs.ca_cert_pem.as_bytes())
            .expect("Failed to parse test CA");
        reqwest::Client::builder()
            .add_root_certificate(ca)
            .resolve("localhost", self.addr)
            .build()
            .expect("Failed to build HTTP client")
    }

    pub fn client_tls_config(&self) -> rustls::ClientConfig {
        let mut config = probe_common::load_client_config_from_pem(&self.certs.ca_cert_pem)
            .expect("Failed to load client TLS config");
        config.alpn_protocols = vec![b"http/1.1".to_vec()];
        config
    }

    /// Open a raw TLS connection to the server
    pub async fn connect_tls(&self) -> Result<TlsStream<TcpStream>> {
        let connector = TlsConnector::from(Arc::new(self.client_tls_config()));
        let tcp_stream = TcpStream::connect(self.addr).await?;
        let server_name = ServerName::try_from("localhost")?;
        Ok(connector.connect(server_name, tcp_stream).await?)
    }

    /// Open a WebSocket over TLS to `path`
    pub async fn connect_websocket(
        &self,
        path: &str,
    ) -> Result<WebSocketStream<TlsStream<TcpStream>>> {
        let stream = self.connect_tls().await?;
        let url = format!("wss://localhost:{}{}", self.addr.port(), path);
        let (ws, response) = tokio_tungstenite::client_async(url, stream).await?;
        tracing::debug!("WebSocket handshake: {}", response.status());
        Ok(ws)
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
