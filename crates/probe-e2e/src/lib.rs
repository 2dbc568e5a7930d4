//! End-to-end test utilities for the probe server
//!
//! Starts a real probe server on an ephemeral `localhost` port with
//! runtime-generated certificates, and provides TLS clients that trust them.

pub mod certificates;
pub mod harness;
pub mod test_client;

pub use certificates::TestCertificates;
pub use harness::TestServer;
pub use test_client::{read_sse_event, send_raw, RawResponse, SseReader};
