//! Cipher method identifiers and tunnel port assignment

use crate::defaults::PORT_STRIDE;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named Shadowsocks cipher, e.g. `aes-256-gcm` or `2022-blake3-aes-128-gcm`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Method(String);

impl Method {
    /// Create a method from its sing-box name
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Method name cannot be empty"));
        }
        // Method names end up in config file names
        if trimmed.contains(['/', '\\']) {
            return Err(AppError::validation(format!("Method name contains a path separator: {}", trimmed)));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key size in bits the method expects for its shared secret
    pub fn key_bits(&self) -> u32 {
        if self.0.contains("128") {
            128
        } else {
            256
        }
    }

    /// Secret length in bytes
    pub fn secret_len(&self) -> usize {
        (self.key_bits() / 8) as usize
    }

    /// Whether this is a Shadowsocks 2022 method, which rejects keys of the wrong length
    pub fn is_2022(&self) -> bool {
        self.0.starts_with("2022-")
    }

    /// The fixed matrix benchmarked when no methods are configured
    pub fn defaults() -> Vec<Method> {
        crate::defaults::DEFAULT_METHODS
            .iter()
            .map(|&name| Method(name.to_string()))
            .collect()
    }

    /// Whether sing-box is known to accept this method name
    pub fn is_known(&self) -> bool {
        const KNOWN: &[&str] = &[
            "none",
            "aes-128-gcm",
            "aes-192-gcm",
            "aes-256-gcm",
            "chacha20-ietf-poly1305",
            "xchacha20-ietf-poly1305",
            "2022-blake3-aes-128-gcm",
            "2022-blake3-aes-256-gcm",
            "2022-blake3-chacha20-poly1305",
        ];
        KNOWN.contains(&self.0.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Method {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Method::new(s)
    }
}

/// Listening ports for one iteration's server and client tunnels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortPair {
    pub server: u16,
    pub client: u16,
}

impl PortPair {
    pub fn new(server: u16, client: u16) -> Self {
        Self { server, client }
    }

    /// Ports for the following iteration, or `None` on overflow
    pub fn next(self) -> Option<Self> {
        Some(Self {
            server: self.server.checked_add(PORT_STRIDE)?,
            client: self.client.checked_add(PORT_STRIDE)?,
        })
    }

    /// The last pair used by a run of `iterations` iterations starting here
    pub fn last_for(self, iterations: usize) -> Option<Self> {
        if iterations == 0 {
            return Some(self);
        }
        let offset = u16::try_from(iterations - 1).ok()?.checked_mul(PORT_STRIDE)?;
        Some(Self {
            server: self.server.checked_add(offset)?,
            client: self.client.checked_add(offset)?,
        })
    }
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server:{} client:{}", self.server, self.client)
    }
}
