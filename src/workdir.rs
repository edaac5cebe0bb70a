//! Per-run directory holding the generated tunnel configs

use crate::error::{ErrorContext, Result};
use crate::models::Method;
use crate::types::TunnelRole;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORKDIR_PREFIX: &str = "sb-bench-";

/// Temporary directory removed on drop unless kept
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh directory under the system temp dir
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()
            .context("Failed to create work directory")?;
        Ok(Self { dir })
    }

    /// Create a fresh directory under `parent`
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create work directory in {}", parent.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `server-<method>.json` or `client-<method>.json`
    pub fn config_path(&self, role: TunnelRole, method: &Method) -> PathBuf {
        config_path_in(self.path(), role, method)
    }

    /// Persist the directory and return its path
    #[allow(deprecated)]
    pub fn keep(self) -> PathBuf {
        self.dir.into_path()
    }

    /// Remove the directory now, reporting failures
    pub fn remove(self) -> Result<()> {
        let path = self.path().display().to_string();
        self.dir
            .close()
            .with_context(|| format!("Failed to remove work directory {}", path))
    }
}

/// Config file location for `role` and `method` inside `dir`
pub fn config_path_in(dir: &Path, role: TunnelRole, method: &Method) -> PathBuf {
    dir.join(format!("{}-{}.json", role.as_str(), method.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let workdir = WorkDir::create().unwrap();
        let method = Method::new("2022-blake3-aes-128-gcm").unwrap();

        let server = workdir.config_path(TunnelRole::Server, &method);
        assert_eq!(server.file_name().unwrap(), "server-2022-blake3-aes-128-gcm.json");
        assert_eq!(server.parent().unwrap(), workdir.path());

        let client = workdir.config_path(TunnelRole::Client, &method);
        assert_eq!(client.file_name().unwrap(), "client-2022-blake3-aes-128-gcm.json");
    }

    #[test]
    fn test_prefix_and_removal() {
        let parent = TempDir::new().unwrap();
        let workdir = WorkDir::create_in(parent.path()).unwrap();
        let path = workdir.path().to_path_buf();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("sb-bench-"));

        std::fs::write(path.join("server-none.json"), "{}").unwrap();
        workdir.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_persists() {
        let parent = TempDir::new().unwrap();
        let workdir = WorkDir::create_in(parent.path()).unwrap();
        let kept = workdir.keep();
        assert!(kept.is_dir());
    }
}
