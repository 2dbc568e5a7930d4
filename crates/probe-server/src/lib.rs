//! Tunnel probe server library
//!
//! A single TLS listener that answers four kinds of traffic so an operator
//! can check what a tunnel forwards: a diagnostic echo page, a WebSocket
//! echo at `/ws`, an SSE counter stream at `/sse`, and `/_health` plus
//! `/uptime` probes. Embedding the server (as the end-to-end tests do) only
//! needs a [`ProbeServer`], a bound listener and a TLS acceptor from
//! [`tls_acceptor`].

mod address;
mod config;
mod credentials;
mod dispatch;
mod duration;
mod render;
mod routes;
mod server;
mod sse;
mod state;
mod websocket;

pub use address::{AddressError, ListenAddress, DEFAULT_HOST};
pub use config::{
    ConfigOverrides, ProbeConfig, ResolvedServerConfig, ServerConfig, DEFAULT_SERVER_NAME,
    DEFAULT_SSE_INTERVAL,
};
pub use credentials::{
    tls_acceptor, CredentialError, CredentialProvider, CredentialSource, SecretCredentials,
    SelfSignedCredentials, TlsCredentials,
};
pub use dispatch::{DispatchError, Dispatcher, ResponseBody};
pub use duration::{parse_duration, parse_duration_ms};
pub use render::{escape_html, render_echo_page, RequestReport};
pub use routes::{Route, HEALTH_PATH, SSE_PATH, UPTIME_PATH, WEBSOCKET_PATH};
pub use server::ProbeServer;
pub use sse::{SseSession, StopReason};
pub use state::{ServerState, UptimeReport};
