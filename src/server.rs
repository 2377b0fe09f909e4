use crate::collectors::bench_cache::BenchmarkCache;
use crate::collectors::storage::StorageResolver;
use crate::collectors::{cpu, mem, os, sensors};
use crate::host::HostView;
use anyhow::Result;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

const INDEX_HTML: &str = include_str!("../web/index.html");
const MAIN_JS:    &str = include_str!("../web/main.js");
const STYLE_CSS:  &str = include_str!("../web/style.css");

/// Everything a request handler may touch.
pub struct AppState {
    pub host:    Arc<dyn HostView>,
    pub storage: StorageResolver,
    pub bench:   BenchmarkCache,
}

/// Accept connections until Ctrl-C. Each connection gets its own task.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("dashboard listening on http://{}", addr);
    }

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(v)  => v,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(route(state, req).await) }
            });
            if let Err(e) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                debug!("connection from {} closed: {}", peer, e);
            }
        });
    }
}

pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return respond(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "method not allowed");
    }
    let path = req.uri().path().to_string();
    debug!("{} {}", req.method(), path);

    match path.as_str() {
        "/api/cpu"     => json_from(state, |s| cpu::cpu_info(s.host.as_ref())).await,
        "/api/mem"     => json_from(state, |s| mem::mem_info(s.host.as_ref())).await,
        "/api/storage" => json_from(state, |s| s.storage.storage_info()).await,
        "/api/sensors" => json_from(state, |_| sensors::read_sensors()).await,
        "/api/os"      => json_from(state, |s| os::os_info(s.host.as_ref())).await,
        "/api/net"     => json_from(state, |s| s.bench.get()).await,

        "/" | "/index.html" => respond(StatusCode::OK, "text/html; charset=utf-8", INDEX_HTML),
        "/main.js"          => respond(StatusCode::OK, "text/javascript; charset=utf-8", MAIN_JS),
        "/style.css"        => respond(StatusCode::OK, "text/css; charset=utf-8", STYLE_CSS),

        _ => respond(StatusCode::NOT_FOUND, "text/plain", "not found"),
    }
}

/// Run a blocking collector off the async workers and encode its result.
async fn json_from<T, F>(state: Arc<AppState>, collect: F) -> Response<Full<Bytes>>
where
    T: Serialize,
    F: FnOnce(&AppState) -> T + Send + 'static,
{
    let encoded = tokio::task::spawn_blocking(move || serde_json::to_vec(&collect(&state))).await;
    match encoded {
        Ok(Ok(body)) => respond(StatusCode::OK, "application/json", body),
        Ok(Err(e)) => {
            error!("encoding response: {}", e);
            respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "encoding error")
        }
        Err(e) => {
            error!("collector task failed: {}", e);
            respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "collector failed")
        }
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}
