//! In-process transfers with reqwest

use super::{socks_proxy_url, TransferTool};
use crate::error::{AppError, Result};
use crate::models::bytes_per_sec_to_mib;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Proxy};
use std::time::{Duration, Instant};
use url::Url;

/// Streams the body through a SOCKS5 proxy and divides bytes by elapsed time
pub struct NativeTransfer {
    connect_timeout: Duration,
}

impl NativeTransfer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            connect_timeout: Duration::from_secs(5),
        })
    }

    fn client_for(&self, proxy_port: u16) -> Result<Client> {
        let proxy = Proxy::all(socks_proxy_url(proxy_port))
            .map_err(|e| AppError::measurement(format!("Invalid proxy for port {}: {}", proxy_port, e)))?;
        Client::builder()
            .proxy(proxy)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::measurement(format!("Failed to create HTTP client: {}", e)))
    }

    async fn download(client: &Client, target: &Url) -> Result<(u64, Duration)> {
        let started = Instant::now();
        let response = client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| AppError::measurement(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::measurement(format!("Server answered {}", response.status())));
        }

        let mut body = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| AppError::measurement(format!("Body read failed: {}", e)))?;
            received += chunk.len() as u64;
        }
        Ok((received, started.elapsed()))
    }
}

#[async_trait]
impl TransferTool for NativeTransfer {
    async fn measure(&self, proxy_port: u16, target: &Url, max_time: Duration) -> Result<f64> {
        let client = self.client_for(proxy_port)?;

        let (received, elapsed) = tokio::time::timeout(max_time, Self::download(&client, target))
            .await
            .map_err(|_| AppError::measurement(format!("Transfer exceeded max time of {:?}", max_time)))??;

        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return Err(AppError::measurement("Transfer finished in zero time"));
        }
        Ok(bytes_per_sec_to_mib(received as f64 / secs))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_proxy_is_measurement_error() {
        // Grab a free port and release it so nothing listens there
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let tool = NativeTransfer::new().unwrap();
        let url = Url::parse("http://127.0.0.1:8000/bench").unwrap();

        let error = tool.measure(port, &url, Duration::from_secs(3)).await.unwrap_err();
        assert_eq!(error.category(), "MEASURE");
    }
}
