//! Upload gateway - HTTP front end for stock sync runs
//!
//! Routes:
//! - `GET  /`        upload page
//! - `POST /upload`  body is the sales sheet (.xlsx or CSV); answers with the
//!                   run message. Form posts are turned away with 415.
//! - `GET  /health`  liveness
//! - `GET  /metrics` run counters in Prometheus text format
//!
//! Uses hyper for the HTTP server. Each upload runs to completion inside its
//! connection task; simultaneous uploads are not coordinated.

use crate::infra::metrics::{Metrics, MetricsSnapshot};
use crate::io::sales_sheet::SheetLayout;
use crate::services::inventory::InventoryService;
use crate::services::reconciler::SyncError;
use crate::services::sync_run::{run_sync, ABORTED_MESSAGE};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

const UNSUPPORTED_FORM_MESSAGE: &str =
    "Send the sales sheet itself as the request body (as the upload page does), not a form.";

const UPLOAD_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Shopify stock update</title></head>
<body>
<h2>Upload the daily sales sheet</h2>
<form id="upload">
  <input type="file" name="file" accept=".xlsx,.csv">
  <input type="submit" value="Update stock">
</form>
<p id="message"></p>
<script>
document.getElementById("upload").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const file = ev.target.file.files[0];
  const message = document.getElementById("message");
  message.textContent = "Updating...";
  const res = await fetch("/upload", { method: "POST", body: file || "" });
  message.textContent = await res.text();
});
</script>
</body>
</html>
"#;

/// Everything a request handler needs
pub struct GatewayState<S: ?Sized> {
    pub layout: SheetLayout,
    pub metrics: Arc<Metrics>,
    pub service: Arc<S>,
}

impl<S: InventoryService + ?Sized> GatewayState<S> {
    pub fn new(service: Arc<S>, layout: SheetLayout, metrics: Arc<Metrics>) -> Self {
        Self { layout, metrics, service }
    }
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Write a simple metric with its HELP and TYPE lines
fn write_metric(output: &mut String, name: &str, help: &str, typ: &str, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {typ}");
    let _ = writeln!(output, "{name} {val}");
}

/// Format counters in Prometheus text exposition format
fn format_prometheus_metrics(snap: &MetricsSnapshot) -> String {
    let mut output = String::with_capacity(1024);
    write_metric(
        &mut output,
        "stock_sync_uptime_seconds",
        "Process uptime",
        "gauge",
        snap.uptime_secs,
    );
    write_metric(
        &mut output,
        "stock_sync_runs_started_total",
        "Sync runs started",
        "counter",
        snap.runs_started,
    );
    write_metric(
        &mut output,
        "stock_sync_runs_completed_total",
        "Sync runs that produced a result",
        "counter",
        snap.runs_completed,
    );
    write_metric(
        &mut output,
        "stock_sync_runs_aborted_total",
        "Sync runs aborted without a result",
        "counter",
        snap.runs_aborted,
    );
    write_metric(
        &mut output,
        "stock_sync_rows_updated_total",
        "Rows whose stock level was written",
        "counter",
        snap.rows_updated,
    );
    write_metric(
        &mut output,
        "stock_sync_rows_failed_total",
        "Rows that missed a variant or had their write rejected",
        "counter",
        snap.rows_failed,
    );
    write_metric(
        &mut output,
        "stock_sync_rows_rejected_total",
        "Sheet rows rejected before reconciliation",
        "counter",
        snap.rows_rejected,
    );
    write_metric(
        &mut output,
        "stock_sync_last_run_duration_ms",
        "Duration of the most recent run",
        "gauge",
        snap.last_run_duration_ms,
    );
    output
}

async fn handle_upload<S>(
    req: Request<hyper::body::Incoming>,
    state: Arc<GatewayState<S>>,
) -> Response<Full<Bytes>>
where
    S: InventoryService + ?Sized,
{
    // The page posts the raw file; form encodings would be read as sheet rows
    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/"));
    if is_form {
        warn!("upload_multipart_rejected");
        return respond(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            TEXT_PLAIN,
            UNSUPPORTED_FORM_MESSAGE,
        );
    }

    let body = match Limited::new(req.into_body(), MAX_UPLOAD_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "upload_body_rejected");
            return respond(
                StatusCode::PAYLOAD_TOO_LARGE,
                TEXT_PLAIN,
                "The file could not be received (too large or interrupted).",
            );
        }
    };

    if body.is_empty() {
        return respond(StatusCode::BAD_REQUEST, TEXT_PLAIN, "No file selected.");
    }

    match run_sync(state.service.as_ref(), &body, &state.layout, &state.metrics).await {
        Ok(report) => respond(StatusCode::OK, TEXT_PLAIN, report.to_string()),
        Err(SyncError::Sheet(e)) => respond(
            StatusCode::BAD_REQUEST,
            TEXT_PLAIN,
            format!("Could not read the sales sheet: {e}"),
        ),
        Err(_) => respond(StatusCode::BAD_GATEWAY, TEXT_PLAIN, ABORTED_MESSAGE),
    }
}

/// Handle HTTP requests
async fn handle_request<S>(
    req: Request<hyper::body::Incoming>,
    state: Arc<GatewayState<S>>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    S: InventoryService + ?Sized,
{
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => respond(StatusCode::OK, "text/html; charset=utf-8", UPLOAD_PAGE),
        (&Method::POST, "/upload") => handle_upload(req, state).await,
        (&Method::GET, "/health") => respond(StatusCode::OK, TEXT_PLAIN, "ok"),
        (&Method::GET, "/metrics") => respond(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            format_prometheus_metrics(&state.metrics.snapshot()),
        ),
        _ => respond(StatusCode::NOT_FOUND, TEXT_PLAIN, "Not Found"),
    };
    Ok(response)
}

/// Bind the configured address and serve until shutdown
pub async fn start_upload_server<S>(
    bind_address: &str,
    port: u16,
    state: Arc<GatewayState<S>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: InventoryService + ?Sized + 'static,
{
    let listener = TcpListener::bind((bind_address, port)).await?;
    serve(listener, state, shutdown).await
}

/// Serve on an already-bound listener until shutdown
pub async fn serve<S>(
    listener: TcpListener,
    state: Arc<GatewayState<S>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: InventoryService + ?Sized + 'static,
{
    info!(addr = %listener.local_addr()?, "upload_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, peer = %peer, "upload_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "upload_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("upload_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
