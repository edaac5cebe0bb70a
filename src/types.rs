//! Type definitions shared across modules

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Which side of the tunnel a process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelRole {
    /// Shadowsocks inbound, direct outbound
    Server,
    /// Local SOCKS inbound, Shadowsocks outbound
    Client,
}

impl TunnelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelRole::Server => "server",
            TunnelRole::Client => "client",
        }
    }
}

impl fmt::Display for TunnelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool used to drive the measured download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// External curl binary reporting `%{speed_download}`
    #[default]
    Curl,
    /// In-process reqwest client through the SOCKS endpoint
    Native,
}

impl std::str::FromStr for TransferKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "curl" => Ok(TransferKind::Curl),
            "native" => Ok(TransferKind::Native),
            other => Err(AppError::parse(format!("Invalid transfer kind: {}", other))),
        }
    }
}

/// Progress of a single benchmark iteration.
///
/// A failure before `ClientStarted` jumps straight to `TornDown` without
/// measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStage {
    Configured,
    ServerStarted,
    ClientStarted,
    Measured,
    TornDown,
}

impl IterationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationStage::Configured => "CONFIGURED",
            IterationStage::ServerStarted => "SERVER_STARTED",
            IterationStage::ClientStarted => "CLIENT_STARTED",
            IterationStage::Measured => "MEASURED",
            IterationStage::TornDown => "TORN_DOWN",
        }
    }
}
