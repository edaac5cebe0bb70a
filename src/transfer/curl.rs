//! curl-driven transfers

use super::{parse_speed_output, socks_proxy_url, TransferTool};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

/// Slack on top of curl's own `--max-time` before the process is killed
const KILL_GUARD: Duration = Duration::from_secs(3);

pub struct CurlTransfer {
    binary: PathBuf,
}

impl CurlTransfer {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments for one download; curl discards the body and prints bytes/s
    pub fn build_args(proxy_port: u16, target: &Url, max_time: Duration) -> Vec<String> {
        vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "-o".to_string(),
            "/dev/null".to_string(),
            "-x".to_string(),
            socks_proxy_url(proxy_port),
            "--max-time".to_string(),
            max_time.as_secs().max(1).to_string(),
            target.to_string(),
            "-w".to_string(),
            "%{speed_download}\n".to_string(),
        ]
    }
}

#[async_trait]
impl TransferTool for CurlTransfer {
    async fn measure(&self, proxy_port: u16, target: &Url, max_time: Duration) -> Result<f64> {
        let run = Command::new(&self.binary)
            .args(Self::build_args(proxy_port, target, max_time))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(max_time + KILL_GUARD, run)
            .await
            .map_err(|_| AppError::measurement(format!("curl did not exit within {:?}", max_time + KILL_GUARD)))?
            .map_err(|e| AppError::measurement(format!("Failed to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            return Err(AppError::measurement(format!(
                "curl exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_speed_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "curl"
    }
}
