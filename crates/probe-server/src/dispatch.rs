//! Per-request routing and the simple responders

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderName, CACHE_CONTROL, CONNECTION, CONTENT_TYPE, HOST, TRANSFER_ENCODING,
};
use hyper::{Request, Response, StatusCode};
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::config::ProbeConfig;
use crate::render::{collect_headers, render_echo_page, RequestReport};
use crate::routes::{is_upgrade_request, Route};
use crate::sse::{self, EVENT_STREAM_CONTENT_TYPE};
use crate::state::ServerState;
use crate::websocket;

pub type ResponseBody = BoxBody<Bytes, Infallible>;

pub fn full(body: impl Into<Bytes>) -> ResponseBody {
    Full::new(body.into()).boxed()
}

/// Returned to hyper to drop a connection without writing a response
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("upgrade requested on non-upgradable path {path}")]
    UpgradeRejected { path: String },
}

/// Routes each request to exactly one handler
pub struct Dispatcher {
    state: Arc<ServerState>,
    config: ProbeConfig,
}

impl Dispatcher {
    pub fn new(state: Arc<ServerState>, config: ProbeConfig) -> Arc<Self> {
        Arc::new(Self { state, config })
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub async fn handle(
        self: Arc<Self>,
        req: Request<Incoming>,
        peer_addr: SocketAddr,
    ) -> Result<Response<ResponseBody>, DispatchError> {
        let url = self.request_url(&req);
        let path = url
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let route = Route::from_path(&path);

        tracing::debug!(
            "{} {} from {} -> {:?}",
            req.method(),
            req.uri(),
            peer_addr,
            route
        );

        if is_upgrade_request(req.headers()) {
            return match route {
                Route::WebSocket => Ok(websocket::accept(req)),
                _ => {
                    tracing::warn!("Dropping upgrade request for {} from {}", path, peer_addr);
                    Err(DispatchError::UpgradeRejected { path })
                }
            };
        }

        let response = match route {
            Route::Health => health(),
            Route::Uptime => self.uptime(),
            Route::Sse => self.sse(&req),
            Route::WebSocket | Route::Echo => self.echo_page(req, url, peer_addr).await,
        };
        Ok(response)
    }

    fn request_url(&self, req: &Request<Incoming>) -> Option<Url> {
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let host = req.headers().get(HOST).and_then(|h| h.to_str().ok());

        resolve_request_url(host, target, self.state.local_addr())
    }

    fn uptime(&self) -> Response<ResponseBody> {
        let report = self.state.uptime_report();
        match serde_json::to_vec(&report) {
            Ok(json) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .body(full(json))
                .unwrap(),
            Err(e) => {
                tracing::error!("Failed to serialize uptime: {}", e);
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(full("Failed to serialize uptime"))
                    .unwrap()
            }
        }
    }

    fn sse(&self, req: &Request<Incoming>) -> Response<ResponseBody> {
        let freq = req.uri().query().and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == "freq")
                .map(|(_, value)| value.into_owned())
        });
        let interval = sse::resolve_interval(freq.as_deref(), self.config.default_sse_interval);

        tracing::debug!("SSE stream every {:?}", interval);

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive")
            .body(sse::start_stream(interval).boxed())
            .unwrap()
    }

    async fn echo_page(
        &self,
        req: Request<Incoming>,
        url: Option<Url>,
        peer_addr: SocketAddr,
    ) -> Response<ResponseBody> {
        let header_text = |name: HeaderName| {
            req.headers()
                .get(name)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default()
        };

        let mut report = RequestReport {
            method: req.method().to_string(),
            protocol: format!("{:?}", req.version()),
            url: url
                .map(|u| u.to_string())
                .unwrap_or_else(|| req.uri().to_string()),
            transfer_encoding: header_text(TRANSFER_ENCODING),
            host: header_text(HOST),
            remote_addr: peer_addr.to_string(),
            uri: req.uri().to_string(),
            headers: collect_headers(req.headers()),
            body: String::new(),
        };

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::error!("Failed to read request body: {}", e);
                return Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(full("Failed to read request body"))
                    .unwrap();
            }
        };
        report.body = String::from_utf8_lossy(&body).into_owned();

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(full(render_echo_page(&self.config.server_name, &report)))
            .unwrap()
    }
}

/// Resolve the request target against `https://<host>/`, or against the
/// bound address when the Host header is missing or unusable. The host only
/// ever supplies the base, so the path always comes from the request line.
pub fn resolve_request_url(
    host: Option<&str>,
    target: &str,
    fallback: SocketAddr,
) -> Option<Url> {
    let target = if target.starts_with('/') { target } else { "/" };

    host.and_then(|host| Url::parse(&format!("https://{}/", host)).ok())
        .and_then(|base| base.join(target).ok())
        .or_else(|| {
            Url::parse(&format!("https://{}/", fallback))
                .ok()?
                .join(target)
                .ok()
        })
}

fn health() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .body(full("ok"))
        .unwrap()
}
