use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::address::ListenAddress;
use crate::config::ProbeConfig;
use crate::dispatch::Dispatcher;
use crate::state::ServerState;

/// Pause after an accept error that is not tied to a single client, such as
/// running out of file descriptors
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TLS listener serving the probe routes
pub struct ProbeServer {
    config: ProbeConfig,
    tls_acceptor: TlsAcceptor,
}

impl ProbeServer {
    pub fn new(config: ProbeConfig, tls_acceptor: TlsAcceptor) -> Arc<Self> {
        Arc::new(Self {
            config,
            tls_acceptor,
        })
    }

    /// Bind the listening socket for `addr`
    pub async fn bind(addr: &ListenAddress) -> Result<TcpListener> {
        TcpListener::bind((addr.host.as_str(), addr.port))
            .await
            .with_context(|| format!("Failed to bind {}", addr))
    }

    /// Serve connections from an already bound listener until `shutdown`
    /// resolves. The uptime clock starts here.
    pub async fn run_with_listener<F>(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        let state = Arc::new(ServerState::new(local_addr));
        let dispatcher = Dispatcher::new(state, self.config.clone());

        tracing::info!("Starting probe server at {}", dispatcher.state().local_addr());

        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut shutdown => {
                    tracing::info!("Probe server on {} shutting down", local_addr);
                    return Ok(());
                }
            };
            let (stream, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Accept error on {}: {}", local_addr, e);
                    if let Some(pause) = accept_backoff(&e) {
                        tokio::time::sleep(pause).await;
                    }
                    continue;
                }
            };
            tracing::debug!("Connection from {}", peer_addr);

            let acceptor = self.tls_acceptor.clone();
            let dispatcher = dispatcher.clone();

            tokio::spawn(async move {
                match acceptor.accept(stream).await {
                    Ok(tls_stream) => {
                        serve_connection(dispatcher, tls_stream, peer_addr).await;
                    }
                    Err(e) => {
                        tracing::warn!("TLS handshake failed from {}: {}", peer_addr, e);
                    }
                }
            });
        }
    }
}

/// How long to wait before accepting again. Errors caused by one client
/// going away retry immediately; anything else backs off briefly.
fn accept_backoff(error: &io::Error) -> Option<Duration> {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}

/// Serve HTTP/1.1 (with upgrades) on one established stream
async fn serve_connection<S>(dispatcher: Arc<Dispatcher>, stream: S, peer_addr: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.handle(req, peer_addr).await }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(io, service)
        .with_upgrades()
        .await
    {
        tracing::debug!("HTTP connection error from {}: {}", peer_addr, e);
    }
}
