//! SSE counter stream end-to-end tests

use std::time::{Duration, Instant};

use probe_e2e::{read_sse_event, SseReader, TestServer};
use probe_server::ProbeConfig;

fn init_test() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let _ = tracing_subscriber::fmt()
        .with_env_filter("probe_server=debug,probe_e2e=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_sse_counts_at_requested_interval() {
    init_test();

    let server = TestServer::start().await;
    let started = Instant::now();
    let resp = server
        .http_client()
        .get(server.url("/sse?freq=200ms"))
        .send()
        .await
        .expect("SSE request failed");

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/event-stream; charset=utf-8"
    );
    assert_eq!(resp.headers()["cache-control"].to_str().unwrap(), "no-cache");

    let mut events = SseReader::new(resp);
    let mut arrivals = Vec::new();
    for expected in ["0", "1", "2"] {
        let event = read_sse_event(&mut events, Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(event, expected);
        arrivals.push(started.elapsed());
    }

    // First event waits a full interval; the rest follow one interval apart
    assert!(arrivals[0] >= Duration::from_millis(180), "{:?}", arrivals);
    assert!(arrivals[2] >= Duration::from_millis(580), "{:?}", arrivals);
    assert!(arrivals[2] < Duration::from_secs(3), "{:?}", arrivals);
}

#[tokio::test]
async fn test_sse_bad_freq_uses_default_interval() {
    init_test();

    let server = TestServer::start().await;
    let resp = server
        .http_client()
        .get(server.url("/sse?freq=notaduration"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/event-stream; charset=utf-8"
    );

    // The default interval is 10s, so nothing shows up this soon
    let mut events = SseReader::new(resp);
    assert!(read_sse_event(&mut events, Duration::from_secs(1))
        .await
        .is_err());
}

#[tokio::test]
async fn test_sse_configured_default_interval() {
    init_test();

    let server = TestServer::start_with(ProbeConfig {
        default_sse_interval: Duration::from_millis(100),
        ..Default::default()
    })
    .await;

    let resp = server
        .http_client()
        .get(server.url("/sse"))
        .send()
        .await
        .unwrap();
    let mut events = SseReader::new(resp);

    assert_eq!(
        read_sse_event(&mut events, Duration::from_secs(3))
            .await
            .unwrap(),
        "0"
    );
    assert_eq!(
        read_sse_event(&mut events, Duration::from_secs(3))
            .await
            .unwrap(),
        "1"
    );
}

#[tokio::test]
async fn test_sse_client_disconnect_leaves_server_healthy() {
    init_test();

    let server = TestServer::start().await;
    let client = server.http_client();

    for _ in 0..5 {
        let resp = client
            .get(server.url("/sse?freq=10ms"))
            .send()
            .await
            .unwrap();
        let mut events = SseReader::new(resp);
        read_sse_event(&mut events, Duration::from_secs(3))
            .await
            .unwrap();
        drop(events);
    }

    let health = client.get(server.url("/_health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");
}
