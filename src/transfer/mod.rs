//! Timed downloads through a tunnel's local SOCKS endpoint

pub mod curl;
pub mod native;

use crate::error::{AppError, Result};
use crate::models::{bytes_per_sec_to_mib, Config};
use crate::types::TransferKind;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub use curl::CurlTransfer;
pub use native::NativeTransfer;

/// Drives one download and reports its average rate
#[async_trait]
pub trait TransferTool: Send + Sync {
    /// Download `target` through `socks5h://127.0.0.1:<proxy_port>`.
    ///
    /// Returns the average rate in MiB/s. Any failure, including running
    /// past `max_time`, is an error.
    async fn measure(&self, proxy_port: u16, target: &Url, max_time: Duration) -> Result<f64>;

    fn name(&self) -> &'static str;
}

/// Proxy URL for a client tunnel listening on loopback
pub fn socks_proxy_url(port: u16) -> String {
    format!("socks5h://127.0.0.1:{}", port)
}

/// Convert the `%{speed_download}` output of curl (bytes/s) to MiB/s
pub fn parse_speed_output(output: &str) -> Result<f64> {
    let line = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or_else(|| AppError::measurement("Transfer tool printed no rate"))?;

    let bytes_per_sec: f64 = line
        .parse()
        .map_err(|_| AppError::measurement(format!("Transfer tool printed a non-numeric rate: {:?}", line)))?;

    if !bytes_per_sec.is_finite() || bytes_per_sec < 0.0 {
        return Err(AppError::measurement(format!("Transfer rate out of range: {}", line)));
    }

    Ok(bytes_per_sec_to_mib(bytes_per_sec))
}

/// Transfer tool selected by the configuration
pub fn from_config(config: &Config) -> Result<Box<dyn TransferTool>> {
    Ok(match config.transfer {
        TransferKind::Curl => Box::new(CurlTransfer::new(config.curl_binary())),
        TransferKind::Native => Box::new(NativeTransfer::new()?),
    })
}
