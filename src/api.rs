//! Health & status endpoints.
//!
//! Minimal HTTP responder:
//! - GET /health - liveness check
//! - GET /metrics - Prometheus metrics
//! - GET /status - uptime and both checkpoint heights

use std::net::SocketAddr;
use std::time::Instant;

use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use crate::checkpoint::CheckpointStore;
use crate::metrics;

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    uptime_seconds: u64,
    checkpoints: CheckpointStatus,
}

#[derive(Serialize)]
struct CheckpointStatus {
    source_height: u64,
    relay_height: u32,
}

/// Serve the API until the process exits.
pub async fn start_api_server(addr: SocketAddr, store: CheckpointStore) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let started = Instant::now();
    tracing::info!(%addr, "API server started");

    metrics::UP.set(1.0);

    loop {
        let (mut socket, _) = listener.accept().await?;
        let store = store.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            if socket.readable().await.is_ok() {
                let _ = socket.try_read(&mut buf);
            }

            let request = String::from_utf8_lossy(&buf);

            if request.contains("GET /metrics") {
                let encoder = TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut body = Vec::new();
                let _ = encoder.encode(&metric_families, &mut body);

                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
            } else if request.contains("GET /health") {
                let response =
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
                let _ = socket.write_all(response.as_bytes()).await;
            } else if request.contains("GET /status") {
                let status = build_status_response(&store, started);
                let body = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            } else {
                let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
    }
}

fn build_status_response(store: &CheckpointStore, started: Instant) -> StatusResponse {
    StatusResponse {
        status: "ok".to_string(),
        uptime_seconds: started.elapsed().as_secs(),
        checkpoints: CheckpointStatus {
            source_height: store.last_source_height().unwrap_or(0),
            relay_height: store.last_relay_height().unwrap_or(0),
        },
    }
}
