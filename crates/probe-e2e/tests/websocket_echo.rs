//! WebSocket echo and upgrade handling end-to-end tests

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use probe_e2e::{send_raw, TestServer};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;

fn init_test() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let _ = tracing_subscriber::fmt()
        .with_env_filter("probe_server=debug,probe_e2e=debug")
        .with_test_writer()
        .try_init();
}

fn upgrade_request(path: &str) -> String {
    upgrade_request_with_host(path, "localhost")
}

fn upgrade_request_with_host(path: &str, host: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        path, host
    )
}

/// Send a request and return the first chunk of the reply, for exchanges
/// that leave the connection open
async fn first_reply<S>(stream: &mut S, request: &str) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("no reply within 5s")
        .unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[tokio::test]
async fn test_websocket_echoes_in_order() {
    init_test();

    let server = TestServer::start().await;
    let mut ws = server
        .connect_websocket("/ws")
        .await
        .expect("WebSocket handshake failed");

    let sent = vec![
        Message::text("first"),
        Message::binary(vec![0xde, 0xad, 0xbe, 0xef]),
        Message::text("third"),
    ];
    for message in &sent {
        ws.send(message.clone()).await.unwrap();
    }

    for expected in sent {
        let got = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no echo within 5s")
            .expect("stream ended")
            .expect("read failed");
        assert_eq!(got, expected);
    }

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_websocket_connections_are_independent() {
    init_test();

    let server = TestServer::start().await;
    let mut a = server.connect_websocket("/ws").await.unwrap();
    let mut b = server.connect_websocket("/ws").await.unwrap();

    a.send(Message::text("from a")).await.unwrap();
    b.send(Message::text("from b")).await.unwrap();

    assert_eq!(a.next().await.unwrap().unwrap(), Message::text("from a"));
    assert_eq!(b.next().await.unwrap().unwrap(), Message::text("from b"));
}

#[tokio::test]
async fn test_upgrade_on_ws_path_switches_protocols() {
    init_test();

    let server = TestServer::start().await;
    let mut stream = server.connect_tls().await.unwrap();

    let reply = first_reply(&mut stream, &upgrade_request("/ws")).await;

    assert!(reply.starts_with("HTTP/1.1 101"), "got: {}", reply);
    assert!(reply
        .to_ascii_lowercase()
        .contains("sec-websocket-accept: s3pplmbitxaq9kygzzhzrbk+xoo="));
}

#[tokio::test]
async fn test_upgrade_routes_by_request_path_not_host() {
    init_test();

    let server = TestServer::start().await;

    for host in ["localhost#", "localhost?", "localhost/other"] {
        let mut stream = server.connect_tls().await.unwrap();
        let reply = first_reply(&mut stream, &upgrade_request_with_host("/ws", host)).await;
        assert!(reply.starts_with("HTTP/1.1 101"), "host {:?}: {}", host, reply);
    }
}

#[tokio::test]
async fn test_upgrade_elsewhere_drops_connection() {
    init_test();

    let server = TestServer::start().await;
    let mut stream = server.connect_tls().await.unwrap();

    let response = send_raw(&mut stream, &upgrade_request("/notws"), Duration::from_secs(5))
        .await
        .expect("connection should be closed by the server");

    assert!(
        !response.has_status_line(),
        "expected no HTTP response, got: {}",
        response.text()
    );
    assert!(response.bytes.is_empty());
}

#[tokio::test]
async fn test_malformed_handshake_on_ws_path_is_rejected() {
    init_test();

    let server = TestServer::start().await;
    let mut stream = server.connect_tls().await.unwrap();

    // No Sec-WebSocket-Key or version
    let request = "GET /ws HTTP/1.1\r\n\
                   Host: localhost\r\n\
                   Connection: Upgrade\r\n\
                   Upgrade: websocket\r\n\
                   \r\n";
    let reply = first_reply(&mut stream, request).await;

    assert!(reply.starts_with("HTTP/1.1 400"), "got: {}", reply);
}
