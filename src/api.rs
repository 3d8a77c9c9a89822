// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! HTTP query interface for the statistics pipeline.
//!
//! Exposes endpoints on a configurable bind address (default port 8791):
//! - `GET /data` — current statistics snapshot as JSON
//! - `GET /api/health` — health check with uptime
//! - `/` — minimal HTML index listing endpoints
//!
//! Every `/data` request runs the full pipeline; there is no cached
//! snapshot to go stale. Rate limiting and page rendering belong to the
//! surrounding deployment, not here.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

use crate::publish::Pipeline;

fn json_response(status: StatusCode, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::from(body))
        .unwrap()
}

async fn handle(
    req: Request<Body>,
    pipeline: Arc<Pipeline>,
    start_time: Instant,
) -> Result<Response<Body>, Infallible> {
    let resp = match req.uri().path() {
        "/" => {
            let html = r#"<!DOCTYPE html><html><head><title>authwatch</title></head><body>
<h1>authwatch is running</h1>
<ul>
<li><a href="/data">/data</a> — Current failed-login statistics</li>
<li><a href="/api/health">/api/health</a> — Health check</li>
</ul></body></html>"#;
            Response::builder()
                .header("Content-Type", "text/html")
                .body(Body::from(html))
                .unwrap()
        }
        "/data" => {
            let snapshot = pipeline.snapshot();
            json_response(StatusCode::OK, serde_json::to_string(&snapshot).unwrap())
        }
        "/api/health" => {
            let resp = serde_json::json!({
                "healthy": true,
                "uptime_seconds": start_time.elapsed().as_secs(),
                "version": env!("CARGO_PKG_VERSION"),
            });
            json_response(StatusCode::OK, serde_json::to_string(&resp).unwrap())
        }
        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    };
    Ok(resp)
}

/// Start the HTTP API server on the given bind address and port.
///
/// Runs indefinitely, computing a fresh snapshot per `/data` request.
pub async fn run_api_server(bind: &str, port: u16, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    let start_time = Instant::now();

    let make_svc = make_service_fn(move |_conn| {
        let pipeline = pipeline.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle(req, pipeline.clone(), start_time)
            }))
        }
    });

    eprintln!("API server listening on {}", addr);
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
