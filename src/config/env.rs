//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::Method;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; existing variables win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SINGBOX_PATH" | "OPENSSL_PATH" | "CURL_PATH" => {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "BENCH_METHODS" => {
                let mut count = 0;
                for method in value.split(',').map(str::trim).filter(|m| !m.is_empty()) {
                    Method::new(method)
                        .map_err(|e| AppError::config(format!("Invalid BENCH_METHODS entry '{}': {}", method, e)))?;
                    count += 1;
                }
                if count == 0 {
                    return Err(AppError::config("BENCH_METHODS must name at least one method"));
                }
            }
            "BENCH_DURATION_SECONDS" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid BENCH_DURATION_SECONDS value '{}': {}", value, e)))?;
                if secs == 0 || secs > 3600 {
                    return Err(AppError::config(format!(
                        "BENCH_DURATION_SECONDS must be between 1 and 3600, got: {}",
                        secs
                    )));
                }
            }
            "BENCH_HTTP_PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid BENCH_HTTP_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("BENCH_HTTP_PORT must be greater than 0"));
                }
            }
            "BENCH_MAX_BYTES" => {
                let bytes: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid BENCH_MAX_BYTES value '{}': {}", value, e)))?;
                if bytes == 0 {
                    return Err(AppError::config("BENCH_MAX_BYTES must be greater than 0"));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SINGBOX_PATH", "Path of the sing-box binary", "/usr/bin/sing-box"),
            ("OPENSSL_PATH", "Path of the openssl binary", "/usr/bin/openssl"),
            ("CURL_PATH", "Path of the curl binary", "/usr/bin/curl"),
            ("BENCH_METHODS", "Comma-separated methods to benchmark", "none,aes-256-gcm"),
            ("BENCH_DURATION_SECONDS", "Transfer duration in seconds (1-3600)", "12"),
            ("BENCH_HTTP_PORT", "Port of the local stream server", "8000"),
            ("BENCH_MAX_BYTES", "Byte ceiling per stream request", "8589934592"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables, one message per bad value
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value).err().map(|e| match e {
                    AppError::Config(message) => message,
                    other => other.to_string(),
                })
            })
            .collect()
    }
}
