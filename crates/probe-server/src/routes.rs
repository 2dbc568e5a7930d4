//! Fixed route table

use hyper::header::{CONNECTION, UPGRADE};
use hyper::HeaderMap;

pub const UPTIME_PATH: &str = "/uptime";
pub const SSE_PATH: &str = "/sse";
pub const HEALTH_PATH: &str = "/_health";
pub const WEBSOCKET_PATH: &str = "/ws";

/// Where a request goes. Paths match exactly and case-sensitively;
/// everything else is the echo page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Uptime,
    Sse,
    Health,
    WebSocket,
    Echo,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        match path {
            UPTIME_PATH => Route::Uptime,
            SSE_PATH => Route::Sse,
            HEALTH_PATH => Route::Health,
            WEBSOCKET_PATH => Route::WebSocket,
            _ => Route::Echo,
        }
    }
}

/// Whether the request asks to switch protocols: an `Upgrade` header plus
/// the `upgrade` token in `Connection`.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let has_upgrade = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    let has_connection_upgrade = headers.get_all(CONNECTION).iter().any(|v| {
        v.to_str()
            .unwrap_or("")
            .split(',')
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    });

    has_upgrade && has_connection_upgrade
}
