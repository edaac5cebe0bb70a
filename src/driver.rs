//! Benchmark driver
//!
//! Runs one iteration per method, strictly in sequence:
//! secret, config pair, server tunnel, client tunnel, transfer, teardown.
//! Every iteration yields exactly one result and the port pair advances by
//! the stride whether the iteration succeeded or not.

use crate::error::{AppError, Result};
use crate::logging::BenchLogger;
use crate::models::{BenchmarkResult, Config, Method, PortPair, ResultSet};
use crate::transfer::TransferTool;
use crate::tunnel::{SecretGenerator, TunnelConfigPair, TunnelLauncher, TunnelStack};
use crate::types::{IterationStage, TunnelRole};
use crate::workdir::config_path_in;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Where an iteration stopped and why
type StageResult<T> = std::result::Result<T, (IterationStage, AppError)>;

/// Receives progress while a run is in flight
pub trait ProgressObserver: Send + Sync {
    fn method_started(&self, _method: &Method) {}

    fn method_finished(&self, _result: &BenchmarkResult) {}
}

/// Observer that ignores everything
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Timing and addressing for a run
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Ports of the first iteration
    pub base_ports: PortPair,
    /// Stream server URL fetched through each tunnel
    pub target: Url,
    /// Upper bound for one transfer
    pub max_time: Duration,
    /// Pause between client start and transfer
    pub stabilize_delay: Duration,
    /// Pause after teardown before the next iteration
    pub port_release_delay: Duration,
    /// Directory receiving the config files
    pub workdir: PathBuf,
}

impl DriverSettings {
    pub fn from_config(config: &Config, target: Url, workdir: &Path) -> Self {
        Self {
            base_ports: config.base_ports(),
            target,
            max_time: config.transfer_max_time(),
            stabilize_delay: crate::defaults::STABILIZE_DELAY,
            port_release_delay: crate::defaults::PORT_RELEASE_DELAY,
            workdir: workdir.to_path_buf(),
        }
    }
}

pub struct BenchmarkDriver {
    settings: DriverSettings,
    secrets: Box<dyn SecretGenerator>,
    launcher: Box<dyn TunnelLauncher>,
    transfer: Box<dyn TransferTool>,
    logger: BenchLogger,
}

impl BenchmarkDriver {
    pub fn new(
        settings: DriverSettings,
        secrets: Box<dyn SecretGenerator>,
        launcher: Box<dyn TunnelLauncher>,
        transfer: Box<dyn TransferTool>,
    ) -> Self {
        Self {
            settings,
            secrets,
            launcher,
            transfer,
            logger: BenchLogger::quiet(),
        }
    }

    pub fn with_logger(mut self, logger: BenchLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Benchmark every method in order.
    ///
    /// Only fails up front, when the port range cannot hold all methods.
    /// Iteration failures become failed results.
    pub async fn run(&self, methods: &[Method], observer: &dyn ProgressObserver) -> Result<ResultSet> {
        let first = self.settings.base_ports;
        if first.last_for(methods.len()).is_none() {
            return Err(AppError::config(format!(
                "Port range starting at {} does not fit {} methods",
                first,
                methods.len()
            )));
        }

        let mut results = ResultSet::new();
        let mut ports = first;

        for method in methods {
            observer.method_started(method);
            let result = self.run_iteration(method, ports).await;
            observer.method_finished(&result);
            results.push(result);

            tokio::time::sleep(self.settings.port_release_delay).await;

            if let Some(next) = ports.next() {
                ports = next;
            }
        }

        Ok(results)
    }

    /// One full iteration; tunnels are always torn down before returning
    async fn run_iteration(&self, method: &Method, ports: PortPair) -> BenchmarkResult {
        let started_at = Utc::now();
        let id = self.logger.log_iteration_start(method, ports).await;

        let mut stack = TunnelStack::new();
        let outcome = self.drive(&id, method, ports, &mut stack).await;

        for role in stack.close().await {
            self.logger.log_process_stopped(&id, role).await;
        }
        self.logger.log_stage(&id, method, IterationStage::TornDown).await;

        let result = match outcome {
            Ok(speed) => BenchmarkResult::measured(method.clone(), ports, speed, started_at),
            Err((stage, error)) => {
                self.logger.log_iteration_failure(&id, method, stage, &error).await;
                BenchmarkResult::failed(method.clone(), ports, stage, error.to_string(), started_at)
            }
        };
        self.logger.log_result(&id, &result).await;
        result
    }

    async fn drive(&self, id: &str, method: &Method, ports: PortPair, stack: &mut TunnelStack) -> StageResult<f64> {
        let mut stage = IterationStage::Configured;

        let secret = self.secrets.for_method(method).await.map_err(|e| (stage, e))?;
        let pair = TunnelConfigPair::generate(method, &secret, ports);

        let server_path = config_path_in(&self.settings.workdir, TunnelRole::Server, method);
        let client_path = config_path_in(&self.settings.workdir, TunnelRole::Client, method);
        pair.server.write_to(&server_path).map_err(|e| (stage, e))?;
        pair.client.write_to(&client_path).map_err(|e| (stage, e))?;
        self.logger.log_configs_written(id, &server_path, &client_path).await;
        self.logger.log_stage(id, method, stage).await;

        let server = self
            .launcher
            .launch(&server_path, TunnelRole::Server)
            .await
            .map_err(|e| (stage, e))?;
        stack.push(server);
        self.logger.log_process_started(id, TunnelRole::Server, &server_path).await;
        stage = IterationStage::ServerStarted;
        self.logger.log_stage(id, method, stage).await;

        let client = self
            .launcher
            .launch(&client_path, TunnelRole::Client)
            .await
            .map_err(|e| (stage, e))?;
        stack.push(client);
        self.logger.log_process_started(id, TunnelRole::Client, &client_path).await;
        stage = IterationStage::ClientStarted;
        self.logger.log_stage(id, method, stage).await;

        tokio::time::sleep(self.settings.stabilize_delay).await;

        let speed = self
            .transfer
            .measure(ports.client, &self.settings.target, self.settings.max_time)
            .await
            .map_err(|e| (stage, e))?;
        self.logger.log_stage(id, method, IterationStage::Measured).await;

        Ok(speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::{Secret, TunnelHandle};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FixedSecrets;

    #[async_trait]
    impl SecretGenerator for FixedSecrets {
        async fn generate(&self, len: usize) -> Result<Secret> {
            Ok(Secret::new_unchecked("x".repeat(len)))
        }
    }

    struct NoopHandle(TunnelRole);

    #[async_trait]
    impl TunnelHandle for NoopHandle {
        fn role(&self) -> TunnelRole {
            self.0
        }

        async fn shutdown(self: Box<Self>) {}
    }

    #[derive(Default)]
    struct CountingLauncher {
        launched: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl TunnelLauncher for CountingLauncher {
        async fn launch(&self, config_path: &Path, role: TunnelRole) -> Result<Box<dyn TunnelHandle>> {
            self.launched.lock().unwrap().push(config_path.to_path_buf());
            Ok(Box::new(NoopHandle(role)))
        }
    }

    struct PortEcho;

    #[async_trait]
    impl TransferTool for PortEcho {
        async fn measure(&self, proxy_port: u16, _target: &Url, _max_time: Duration) -> Result<f64> {
            Ok(proxy_port as f64)
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn settings(workdir: &Path, base: PortPair) -> DriverSettings {
        DriverSettings {
            base_ports: base,
            target: Url::parse("http://127.0.0.1:8000/bench").unwrap(),
            max_time: Duration::from_secs(1),
            stabilize_delay: Duration::ZERO,
            port_release_delay: Duration::ZERO,
            workdir: workdir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_ports_advance_and_configs_written() {
        let dir = TempDir::new().unwrap();
        let launcher = Arc::new(CountingLauncher::default());
        let driver = BenchmarkDriver::new(
            settings(dir.path(), PortPair::new(20000, 15000)),
            Box::new(FixedSecrets),
            Box::new(SharedLauncher(launcher.clone())),
            Box::new(PortEcho),
        );

        let methods = vec![Method::new("none").unwrap(), Method::new("aes-128-gcm").unwrap()];
        let results = driver.run(&methods, &NoProgress).await.unwrap();

        let ports: Vec<PortPair> = results.iter().map(|r| r.ports).collect();
        assert_eq!(ports, vec![PortPair::new(20000, 15000), PortPair::new(20002, 15002)]);
        assert_eq!(results.results[1].speed_mib, Some(15002.0));

        let launched = launcher.launched.lock().unwrap();
        assert_eq!(launched.len(), 4);
        assert!(launched[0].ends_with("server-none.json"));
        assert!(launched[1].ends_with("client-none.json"));
        assert!(dir.path().join("client-aes-128-gcm.json").exists());
    }

    #[tokio::test]
    async fn test_port_overflow_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let driver = BenchmarkDriver::new(
            settings(dir.path(), PortPair::new(65534, 15000)),
            Box::new(FixedSecrets),
            Box::new(CountingLauncher::default()),
            Box::new(PortEcho),
        );
        let methods = vec![Method::new("none").unwrap(), Method::new("aes-128-gcm").unwrap()];
        let error = driver.run(&methods, &NoProgress).await.unwrap_err();
        assert_eq!(error.category(), "CONFIG");
    }

    #[tokio::test]
    async fn test_missing_workdir_fails_each_method() {
        let dir = TempDir::new().unwrap();
        let driver = BenchmarkDriver::new(
            settings(&dir.path().join("gone"), PortPair::new(20000, 15000)),
            Box::new(FixedSecrets),
            Box::new(CountingLauncher::default()),
            Box::new(PortEcho),
        );
        let methods = vec![Method::new("none").unwrap(), Method::new("aes-256-gcm").unwrap()];
        let results = driver.run(&methods, &NoProgress).await.unwrap();

        assert_eq!(results.failed_count(), 2);
        assert!(results.iter().all(|r| r.stage == IterationStage::Configured));
    }

    struct SharedLauncher(Arc<CountingLauncher>);

    #[async_trait]
    impl TunnelLauncher for SharedLauncher {
        async fn launch(&self, config_path: &Path, role: TunnelRole) -> Result<Box<dyn TunnelHandle>> {
            self.0.launch(config_path, role).await
        }
    }
}
