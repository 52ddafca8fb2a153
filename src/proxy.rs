//! Path-prefix reverse proxy in front of the proxied services.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::environment::Service;

const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const HOP_BY_HOP: [header::HeaderName; 5] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
    header::TRAILER,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub service: String,
    /// Path prefix without a trailing slash, `/` for the root.
    pub handle: String,
    /// `host:port` of the upstream.
    pub upstream: String,
}

impl Route {
    fn matches(&self, path: &str) -> bool {
        if self.handle == "/" {
            return true;
        }
        match path.strip_prefix(self.handle.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Routes sorted by handle. Built once per startup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// One route per service with `proxy = true`, a non-empty handle and a
    /// known address.
    pub fn from_services(services: &BTreeMap<String, Service>) -> Self {
        let mut routes: Vec<Route> = services
            .values()
            .filter(|s| s.proxy)
            .filter_map(|s| {
                let handle = s.handle.as_deref().filter(|h| !h.is_empty())?;
                let upstream = s.address()?;
                let trimmed = handle.trim_end_matches('/');
                Some(Route {
                    service: s.name.clone(),
                    handle: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
                    upstream,
                })
            })
            .collect();
        routes.sort_by(|a, b| a.handle.cmp(&b.handle));
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The route with the longest handle matching `path` on a segment boundary.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.handle.len())
    }
}

#[derive(Clone)]
struct ProxyState {
    table: Arc<RouteTable>,
    client: reqwest::Client,
}

pub fn router(table: RouteTable) -> Result<Router> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("building proxy client")?;
    let state = ProxyState {
        table: Arc::new(table),
        client,
    };
    Ok(Router::new()
        .fallback(forward)
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

async fn forward(State(state): State<ProxyState>, req: Request) -> Response {
    let Some(route) = state.table.resolve(req.uri().path()) else {
        return (StatusCode::NOT_FOUND, "no route").into_response();
    };
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://{}{}", route.upstream, path_and_query);
    debug!(service = %route.service, url = %url, "forwarding");

    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    strip_hop_by_hop(&mut headers);

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(service = %route.service, error = %e, "upstream unreachable");
            return (StatusCode::BAD_GATEWAY, format!("{} is unreachable", route.service))
                .into_response();
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = format!("0.0.0.0:{}", port);
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding proxy to {addr}"))
}

/// Serve the route table until `cancel` fires.
pub async fn serve(listener: TcpListener, table: RouteTable, cancel: CancellationToken) -> Result<()> {
    let routes = table.routes().len();
    let app = router(table)?;
    info!(addr = %listener.local_addr()?, routes, "proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    Ok(())
}
