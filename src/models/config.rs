//! Configuration data model and validation

use crate::models::method::{Method, PortPair};
use crate::types::{AppError, Result, TransferKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the sing-box binary
    #[serde(default = "default_singbox_path")]
    pub singbox_path: String,

    /// Path of the openssl binary used for secrets
    #[serde(default = "default_openssl_path")]
    pub openssl_path: String,

    /// Path of the curl binary used for transfers
    #[serde(default = "default_curl_path")]
    pub curl_path: String,

    /// Methods to benchmark, in order
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// Port of the synthetic stream server
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Server tunnel port for the first iteration
    #[serde(default = "default_base_server_port")]
    pub base_server_port: u16,

    /// Client SOCKS port for the first iteration
    #[serde(default = "default_base_client_port")]
    pub base_client_port: u16,

    /// Intended transfer duration in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_seconds: u64,

    /// Byte ceiling per stream request
    #[serde(default = "default_max_test_bytes")]
    pub max_test_bytes: u64,

    /// Transfer implementation
    #[serde(default)]
    pub transfer: TransferKind,

    /// Keep the per-run config directory after the run
    #[serde(default)]
    pub keep_workdir: bool,

    /// Print the result set as JSON instead of a table
    #[serde(default)]
    pub json_output: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            singbox_path: default_singbox_path(),
            openssl_path: default_openssl_path(),
            curl_path: default_curl_path(),
            methods: default_methods(),
            http_port: default_http_port(),
            base_server_port: default_base_server_port(),
            base_client_port: default_base_client_port(),
            duration_seconds: default_duration_secs(),
            max_test_bytes: default_max_test_bytes(),
            transfer: TransferKind::default(),
            keep_workdir: false,
            json_output: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Intended transfer duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    /// Upper bound handed to the transfer tool; always longer than `duration()`
    pub fn transfer_max_time(&self) -> Duration {
        self.duration() + crate::defaults::TRANSFER_GRACE
    }

    /// Ports of the first iteration
    pub fn base_ports(&self) -> PortPair {
        PortPair::new(self.base_server_port, self.base_client_port)
    }

    pub fn singbox_binary(&self) -> PathBuf {
        PathBuf::from(&self.singbox_path)
    }

    pub fn openssl_binary(&self) -> PathBuf {
        PathBuf::from(&self.openssl_path)
    }

    pub fn curl_binary(&self) -> PathBuf {
        PathBuf::from(&self.curl_path)
    }

    /// Parse the configured method names
    pub fn parsed_methods(&self) -> Result<Vec<Method>> {
        self.methods.iter().map(|m| Method::new(m.as_str())).collect()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("sing-box", &self.singbox_path),
            ("openssl", &self.openssl_path),
            ("curl", &self.curl_path),
        ] {
            if path.trim().is_empty() {
                return Err(AppError::config(format!("Path to {} cannot be empty", name)));
            }
        }

        if self.methods.is_empty() {
            return Err(AppError::config("At least one method must be configured"));
        }

        let methods = self.parsed_methods()?;
        let mut seen = HashSet::new();
        for method in &methods {
            // Duplicates would overwrite each other's config files
            if !seen.insert(method.as_str()) {
                return Err(AppError::config(format!("Method listed twice: {}", method)));
            }
        }

        if self.duration_seconds == 0 {
            return Err(AppError::config("Duration must be greater than 0"));
        }

        if self.duration_seconds > 3600 {
            return Err(AppError::config("Duration cannot exceed 3600 seconds"));
        }

        if self.max_test_bytes == 0 {
            return Err(AppError::config("Byte ceiling must be greater than 0"));
        }

        if self.http_port == 0 || self.base_server_port == 0 || self.base_client_port == 0 {
            return Err(AppError::config("Ports must be greater than 0"));
        }

        let first = self.base_ports();
        let last = first.last_for(methods.len()).ok_or_else(|| {
            AppError::config(format!(
                "Port range starting at {} does not fit {} methods",
                first,
                methods.len()
            ))
        })?;

        let server_range = first.server..=last.server;
        let client_range = first.client..=last.client;

        if server_range.start() <= client_range.end() && client_range.start() <= server_range.end() {
            return Err(AppError::config(format!(
                "Server ports {}-{} overlap client ports {}-{}",
                first.server, last.server, first.client, last.client
            )));
        }

        if server_range.contains(&self.http_port) || client_range.contains(&self.http_port) {
            return Err(AppError::config(format!(
                "HTTP port {} collides with the tunnel port ranges",
                self.http_port
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SINGBOX_PATH") {
            self.singbox_path = path;
        }

        if let Ok(path) = std::env::var("OPENSSL_PATH") {
            self.openssl_path = path;
        }

        if let Ok(path) = std::env::var("CURL_PATH") {
            self.curl_path = path;
        }

        if let Ok(methods) = std::env::var("BENCH_METHODS") {
            self.methods = methods
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(duration) = std::env::var("BENCH_DURATION_SECONDS") {
            self.duration_seconds = duration.parse()
                .map_err(|e| AppError::config(format!("Invalid BENCH_DURATION_SECONDS value '{}': {}", duration, e)))?;
        }

        if let Ok(port) = std::env::var("BENCH_HTTP_PORT") {
            self.http_port = port.parse()
                .map_err(|e| AppError::config(format!("Invalid BENCH_HTTP_PORT value '{}': {}", port, e)))?;
        }

        if let Ok(max_bytes) = std::env::var("BENCH_MAX_BYTES") {
            self.max_test_bytes = max_bytes.parse()
                .map_err(|e| AppError::config(format!("Invalid BENCH_MAX_BYTES value '{}': {}", max_bytes, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_singbox_path() -> String {
    crate::defaults::DEFAULT_SINGBOX_PATH.to_string()
}

fn default_openssl_path() -> String {
    crate::defaults::DEFAULT_OPENSSL_PATH.to_string()
}

fn default_curl_path() -> String {
    crate::defaults::DEFAULT_CURL_PATH.to_string()
}

fn default_methods() -> Vec<String> {
    crate::defaults::DEFAULT_METHODS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_http_port() -> u16 {
    crate::defaults::DEFAULT_HTTP_PORT
}

fn default_base_server_port() -> u16 {
    crate::defaults::DEFAULT_BASE_SERVER_PORT
}

fn default_base_client_port() -> u16 {
    crate::defaults::DEFAULT_BASE_CLIENT_PORT
}

fn default_duration_secs() -> u64 {
    crate::defaults::DEFAULT_DURATION_SECS
}

fn default_max_test_bytes() -> u64 {
    crate::defaults::DEFAULT_MAX_TEST_BYTES
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
