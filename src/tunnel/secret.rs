//! Shared secrets for Shadowsocks tunnels

use crate::error::{AppError, Result};
use crate::models::Method;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;

/// Base64 encoded key material shared by a server/client pair
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Accept `encoded` only if it decodes to exactly `expected_len` bytes
    pub fn from_base64(encoded: &str, expected_len: usize) -> Result<Self> {
        let encoded = encoded.trim();
        let decoded = STANDARD.decode(encoded)?;
        if decoded.len() != expected_len {
            return Err(AppError::validation(format!(
                "Secret decodes to {} bytes, expected {}",
                decoded.len(),
                expected_len
            )));
        }
        Ok(Self(encoded.to_string()))
    }

    /// Wrap a string without checking its encoding
    pub fn new_unchecked<S: Into<String>>(encoded: S) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Source of fresh secrets
#[async_trait]
pub trait SecretGenerator: Send + Sync {
    /// Produce a secret of `len` random bytes
    async fn generate(&self, len: usize) -> Result<Secret>;

    /// Produce a secret sized for `method`
    async fn for_method(&self, method: &Method) -> Result<Secret> {
        self.generate(method.secret_len()).await
    }
}

/// Secrets from `openssl rand -base64 <len>`
pub struct OpensslSecretGenerator {
    binary: PathBuf,
}

impl OpensslSecretGenerator {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl SecretGenerator for OpensslSecretGenerator {
    async fn generate(&self, len: usize) -> Result<Secret> {
        let output = Command::new(&self.binary)
            .args(["rand", "-base64", &len.to_string()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::io(format!("Failed to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            return Err(AppError::io(format!(
                "{} rand exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Secret::from_base64(&stdout, len)
    }
}
