use std::net::SocketAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Process-wide server state, fixed once the listener is bound.
///
/// Wall-clock start time is kept for reporting; elapsed time is measured
/// against a monotonic instant so it never goes backwards.
#[derive(Debug)]
pub struct ServerState {
    started_at: DateTime<Utc>,
    started: Instant,
    local_addr: SocketAddr,
}

/// Body of the `/uptime` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeReport {
    pub start_time: String,
    pub uptime: String,
}

impl ServerState {
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            local_addr,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn uptime_report(&self) -> UptimeReport {
        UptimeReport {
            start_time: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            uptime: format!("{}ms", self.uptime().as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptime_ms(report: &UptimeReport) -> u128 {
        report
            .uptime
            .strip_suffix("ms")
            .expect("uptime ends with ms")
            .parse()
            .expect("uptime is an integer")
    }

    #[test]
    fn test_report_shape() {
        let state = ServerState::new("127.0.0.1:8443".parse().unwrap());
        let json = serde_json::to_value(state.uptime_report()).unwrap();

        let start = json["startTime"].as_str().unwrap();
        assert!(start.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(start).is_ok());
        assert!(json["uptime"].as_str().unwrap().ends_with("ms"));
    }

    #[test]
    fn test_uptime_increases() {
        let state = ServerState::new("127.0.0.1:0".parse().unwrap());
        let first = uptime_ms(&state.uptime_report());
        std::thread::sleep(Duration::from_millis(5));
        let second = uptime_ms(&state.uptime_report());
        assert!(second > first, "{} should exceed {}", second, first);
    }
}
