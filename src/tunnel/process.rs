//! Lifecycle of external sing-box processes
//!
//! A tunnel is considered healthy if it is still running once the settle
//! window has passed. Stopping is best effort: SIGTERM, a bounded wait, then
//! a kill. Children are spawned with `kill_on_drop` so that a run aborted
//! mid-iteration does not leak them.
//!
//! stdout is discarded and stderr is drained for the whole life of the
//! child, so a chatty sing-box never blocks on a full pipe. Only the last
//! `STDERR_TAIL_BYTES` are kept for the startup error message.

use crate::error::{AppError, Result};
use crate::types::TunnelRole;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;

/// How long to wait for stderr of a process that already exited
const STDERR_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Stderr bytes kept for diagnostics
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// A running tunnel that can be shut down exactly once
#[async_trait]
pub trait TunnelHandle: Send {
    fn role(&self) -> TunnelRole;

    /// Stop the tunnel. Never fails; termination errors are discarded.
    async fn shutdown(self: Box<Self>);
}

/// Starts tunnels from config files
#[async_trait]
pub trait TunnelLauncher: Send + Sync {
    /// Start one tunnel. A process that dies during the settle window is
    /// reported as `AppError::ProcessStartup` and no handle is returned.
    async fn launch(&self, config_path: &Path, role: TunnelRole) -> Result<Box<dyn TunnelHandle>>;
}

/// Launches `<binary> run -c <config>`
#[derive(Debug, Clone)]
pub struct SingBoxLauncher {
    binary: PathBuf,
    settle: Duration,
    stop_timeout: Duration,
}

impl SingBoxLauncher {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
            settle: crate::defaults::SETTLE_WINDOW,
            stop_timeout: crate::defaults::STOP_TIMEOUT,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl TunnelLauncher for SingBoxLauncher {
    async fn launch(&self, config_path: &Path, role: TunnelRole) -> Result<Box<dyn TunnelHandle>> {
        let mut child = Command::new(&self.binary)
            .arg("run")
            .arg("-c")
            .arg(config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::process_startup(format!(
                    "{} could not spawn {}: {}",
                    role,
                    self.binary.display(),
                    e
                ))
            })?;

        let stderr_tail = child.stderr.take().map(spawn_stderr_tail);

        tokio::time::sleep(self.settle).await;

        match child.try_wait() {
            // The tail task keeps draining until the child exits
            Ok(None) => Ok(Box::new(TunnelProcess {
                child,
                role,
                stop_timeout: self.stop_timeout,
            })),
            Ok(Some(status)) => {
                let stderr = match stderr_tail {
                    Some(tail) => collect_tail(tail).await,
                    None => String::new(),
                };
                Err(AppError::process_startup(format!(
                    "{} sing-box exited with {}: {}",
                    role, status, stderr
                )))
            }
            Err(e) => Err(AppError::process_startup(format!(
                "{} sing-box status unavailable: {}",
                role, e
            ))),
        }
    }
}

/// Read stderr to EOF, keeping only the last `STDERR_TAIL_BYTES`
fn spawn_stderr_tail(mut stderr: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut tail: VecDeque<u8> = VecDeque::with_capacity(STDERR_TAIL_BYTES);
        let mut buf = [0u8; 4096];
        loop {
            match stderr.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    tail.extend(&buf[..n]);
                    let excess = tail.len().saturating_sub(STDERR_TAIL_BYTES);
                    tail.drain(..excess);
                }
            }
        }
        let bytes: Vec<u8> = tail.into();
        String::from_utf8_lossy(&bytes).trim().to_string()
    })
}

async fn collect_tail(tail: JoinHandle<String>) -> String {
    match tokio::time::timeout(STDERR_READ_TIMEOUT, tail).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

/// A live sing-box child process
#[derive(Debug)]
pub struct TunnelProcess {
    child: Child,
    role: TunnelRole,
    stop_timeout: Duration,
}

impl TunnelProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn request_termination(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id().and_then(|pid| i32::try_from(pid).ok()) {
                let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }
    }
}

#[async_trait]
impl TunnelHandle for TunnelProcess {
    fn role(&self) -> TunnelRole {
        self.role
    }

    async fn shutdown(mut self: Box<Self>) {
        self.request_termination();
        match tokio::time::timeout(self.stop_timeout, self.child.wait()).await {
            Ok(Ok(_)) => {}
            _ => {
                let _ = self.child.kill().await;
            }
        }
    }
}

/// Tunnels acquired during one iteration.
///
/// `close` shuts them down newest first (client before server). Handles
/// still held when the stack is dropped are killed by their own drop.
#[derive(Default)]
pub struct TunnelStack {
    handles: Vec<Box<dyn TunnelHandle>>,
}

impl TunnelStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: Box<dyn TunnelHandle>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Shut down every held tunnel in reverse acquisition order and
    /// return the roles in the order they were stopped
    pub async fn close(&mut self) -> Vec<TunnelRole> {
        let mut stopped = Vec::with_capacity(self.handles.len());
        while let Some(handle) = self.handles.pop() {
            stopped.push(handle.role());
            handle.shutdown().await;
        }
        stopped
    }
}
