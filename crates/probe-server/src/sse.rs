//! Server-Sent Events counter stream
//!
//! Each `/sse` request gets its own session: a ticker task that pushes
//! `"<counter>\n\n"` into the response body once per interval. The session
//! stops when the client goes away (the body is dropped) or when a write
//! fails (the body's receiver is gone), whichever happens first.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::duration::parse_duration;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";

/// Timers cannot tick with a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ClientClosed,
    WriteFailed,
}

/// Per-connection SSE state shared between the ticker and the response body
#[derive(Debug)]
pub struct SseSession {
    interval: Duration,
    stopped: OnceLock<StopReason>,
    cancel: CancellationToken,
}

impl SseSession {
    pub fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval: interval.max(MIN_INTERVAL),
            stopped: OnceLock::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the session. Only the first call has any effect and returns
    /// `true`; the ticker is cancelled exactly once.
    pub fn stop(&self, reason: StopReason) -> bool {
        if self.stopped.set(reason).is_err() {
            return false;
        }
        self.cancel.cancel();
        tracing::debug!(?reason, "SSE session stopped");
        true
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped.get().copied()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get().is_some()
    }
}

/// Pick the tick interval from the `freq` query value, falling back to
/// `default` when it is absent, empty or unparsable.
pub fn resolve_interval(freq: Option<&str>, default: Duration) -> Duration {
    freq.and_then(parse_duration).unwrap_or(default)
}

pub fn format_event(counter: u64) -> Bytes {
    Bytes::from(format!("{}\n\n", counter))
}

/// Streaming response body fed by the session's ticker
pub struct SseBody {
    rx: mpsc::Receiver<Bytes>,
    session: Arc<SseSession>,
}

impl SseBody {
    pub fn session(&self) -> &Arc<SseSession> {
        &self.session
    }
}

impl Body for SseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut().rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(Frame::data(event)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        false
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}

impl Drop for SseBody {
    fn drop(&mut self) {
        self.session.stop(StopReason::ClientClosed);
    }
}

/// Start a counter stream ticking every `interval`
pub fn start_stream(interval: Duration) -> SseBody {
    let session = SseSession::new(interval);
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(run_ticker(session.clone(), tx));

    SseBody { rx, session }
}

async fn run_ticker(session: Arc<SseSession>, tx: mpsc::Sender<Bytes>) {
    let period = session.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut counter: u64 = 0;
    loop {
        tokio::select! {
            _ = session.cancel.cancelled() => break,
            _ = ticker.tick() => {
                if tx.send(format_event(counter)).await.is_err() {
                    session.stop(StopReason::WriteFailed);
                    break;
                }
                counter = counter.wrapping_add(1);
            }
        }
    }

    tracing::trace!(events = counter, "SSE ticker finished");
}
