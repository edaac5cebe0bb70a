//! Command-line interface

use crate::types::TransferKind;
use clap::{ArgAction, Parser};

/// Tunnel Throughput Bench - measure sing-box Shadowsocks throughput per cipher
#[derive(Parser, Debug, Clone)]
#[command(name = "tunnel-bench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Method to benchmark (repeatable); defaults to the built-in list
    #[arg(short, long = "method", value_name = "METHOD", action = ArgAction::Append)]
    pub methods: Vec<String>,

    /// Intended transfer duration in seconds
    #[arg(short, long, value_name = "SECS", value_parser = parse_duration)]
    pub duration: Option<u64>,

    /// Port of the local stream server
    #[arg(long, value_name = "PORT")]
    pub http_port: Option<u16>,

    /// Server tunnel port of the first iteration
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Client SOCKS port of the first iteration
    #[arg(long, value_name = "PORT")]
    pub client_port: Option<u16>,

    /// Tool used for the measured download
    #[arg(long, value_enum)]
    pub transfer: Option<TransferKind>,

    /// Path of the sing-box binary
    #[arg(long, value_name = "PATH")]
    pub singbox: Option<String>,

    /// Path of the curl binary
    #[arg(long, value_name = "PATH")]
    pub curl: Option<String>,

    /// Path of the openssl binary
    #[arg(long, value_name = "PATH")]
    pub openssl: Option<String>,

    /// Keep the generated config directory and print its path
    #[arg(long)]
    pub keep_workdir: bool,

    /// Print results as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        for method in &self.methods {
            if method.trim().is_empty() {
                return Err("--method cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 3600 {
                Err("Duration cannot exceed 3600 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
