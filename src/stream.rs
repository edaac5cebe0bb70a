//! Synthetic HTTP stream used as the download target
//!
//! `GET /bench` answers with zeros in fixed-size chunks until the byte
//! ceiling is reached. Every other path is a 404.

use crate::defaults::{SERVER_SHUTDOWN_GRACE, STREAM_CHUNK_SIZE, STREAM_PATH};
use crate::error::{AppError, Result};
use crate::logging::BenchLogger;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use futures::Stream;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

static ZEROS: [u8; STREAM_CHUNK_SIZE] = [0; STREAM_CHUNK_SIZE];

#[derive(Clone, Copy)]
struct StreamState {
    max_bytes: u64,
}

/// Chunks of zeros adding up to exactly `max_bytes`
pub fn zero_stream(max_bytes: u64) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    futures::stream::unfold(0u64, move |sent| async move {
        if sent >= max_bytes {
            return None;
        }
        let remaining = max_bytes - sent;
        let len = usize::try_from(remaining).map_or(STREAM_CHUNK_SIZE, |r| r.min(STREAM_CHUNK_SIZE));
        Some((Ok(Bytes::from_static(&ZEROS[..len])), sent + len as u64))
    })
}

async fn bench_handler(State(state): State<StreamState>) -> Response {
    let body = Body::from_stream(zero_stream(state.max_bytes));
    ([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Stream server configuration; `start` binds and spawns it
pub struct StreamServer {
    addr: SocketAddr,
    max_bytes: u64,
    shutdown_grace: Duration,
    logger: BenchLogger,
}

impl StreamServer {
    /// `addr` may use port 0; the bound address is reported by the handle
    pub fn new(addr: SocketAddr, max_bytes: u64) -> Self {
        Self {
            addr,
            max_bytes,
            shutdown_grace: SERVER_SHUTDOWN_GRACE,
            logger: BenchLogger::quiet(),
        }
    }

    /// Loopback server on `port`
    pub fn loopback(port: u16, max_bytes: u64) -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], port)), max_bytes)
    }

    pub fn with_logger(mut self, logger: BenchLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(STREAM_PATH, get(bench_handler))
            .fallback(not_found)
            .with_state(StreamState {
                max_bytes: self.max_bytes,
            })
    }

    /// Bind the listener and serve in a background task
    pub async fn start(self) -> Result<StreamServerHandle> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| AppError::stream_server(format!("Failed to bind {}: {}", self.addr, e)))?;
        let local_addr = listener.local_addr()?;

        let router = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task_logger = self.logger.clone();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                task_logger
                    .log_stream_server_error(&AppError::stream_server(e.to_string()))
                    .await;
            }
        });

        self.logger.log_stream_server_started(local_addr, self.max_bytes).await;

        Ok(StreamServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            grace: self.shutdown_grace,
            logger: self.logger,
        })
    }
}

/// A running stream server.
///
/// Dropping the handle without calling `shutdown` still stops accepting
/// connections but does not wait for the task.
pub struct StreamServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    grace: Duration,
    logger: BenchLogger,
}

impl StreamServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL of the benchmark stream
    pub fn bench_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}{}", self.local_addr, STREAM_PATH))?)
    }

    /// Stop accepting, wait up to the grace period for in-flight streams,
    /// then abort the server task.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.grace, &mut task).await {
            Ok(Ok(())) => {
                self.logger.log_stream_server_stopped(true).await;
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::stream_server(format!("Stream server task failed: {}", e))),
            Err(_) => {
                task.abort();
                let _ = task.await;
                self.logger.log_stream_server_stopped(false).await;
                Ok(())
            }
        }
    }
}

impl Drop for StreamServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
