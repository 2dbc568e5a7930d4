//! WebSocket echo
//!
//! The handshake is answered by the dispatcher with `101 Switching
//! Protocols`; the upgraded connection is then driven by its own task that
//! sends every text and binary message straight back.

use futures_util::{SinkExt, StreamExt};
use hyper::body::Incoming;
use hyper::header::{
    CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE,
};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

use crate::dispatch::{full, ResponseBody};

const SUPPORTED_VERSION: &str = "13";

/// Answer a WebSocket handshake and spawn the echo task for the upgraded
/// connection. Requests that are not a valid version 13 handshake get 400.
pub fn accept(mut req: Request<Incoming>) -> Response<ResponseBody> {
    let headers = req.headers();

    let version_ok = headers
        .get(SEC_WEBSOCKET_VERSION)
        .map(|v| v.as_bytes() == SUPPORTED_VERSION.as_bytes())
        .unwrap_or(false);

    let key = match headers.get(SEC_WEBSOCKET_KEY) {
        Some(key) if version_ok => key.as_bytes().to_vec(),
        _ => {
            tracing::debug!("Rejecting malformed WebSocket handshake");
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header(SEC_WEBSOCKET_VERSION, SUPPORTED_VERSION)
                .body(full("Bad WebSocket handshake"))
                .unwrap();
        }
    };

    let accept_key = derive_accept_key(&key);
    let on_upgrade = hyper::upgrade::on(&mut req);

    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let ws =
                    WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None)
                        .await;
                echo(ws).await;
            }
            Err(e) => {
                tracing::debug!("WebSocket upgrade failed: {}", e);
            }
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(UPGRADE, "websocket")
        .header(CONNECTION, "Upgrade")
        .header(SEC_WEBSOCKET_ACCEPT, accept_key)
        .body(full(""))
        .unwrap()
}

/// Send every text and binary message back unchanged, in arrival order.
///
/// Control frames are left to tungstenite, which answers pings and close
/// frames on its own. Returns once the peer is gone.
pub async fn echo<S>(mut ws: WebSocketStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut echoed: u64 = 0;

    while let Some(message) = ws.next().await {
        match message {
            Ok(message) if message.is_text() || message.is_binary() => {
                if let Err(e) = ws.send(message).await {
                    tracing::debug!("WebSocket write failed: {}", e);
                    break;
                }
                echoed += 1;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("WebSocket read failed: {}", e);
                break;
            }
        }
    }

    tracing::debug!(echoed, "WebSocket connection closed");
}
