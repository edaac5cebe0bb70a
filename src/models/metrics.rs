//! Throughput results for individual methods and whole runs

use crate::models::method::{Method, PortPair};
use crate::types::IterationStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a bytes-per-second rate to MiB/s
pub fn bytes_per_sec_to_mib(bytes_per_sec: f64) -> f64 {
    bytes_per_sec / BYTES_PER_MIB
}

/// Convert MiB/s to the Gbps figure shown in reports (×8/1000)
pub fn mib_to_gbps(mib_per_sec: f64) -> f64 {
    mib_per_sec * 8.0 / 1000.0
}

/// Outcome of benchmarking one method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Cipher that was benchmarked
    pub method: Method,

    /// Average throughput in MiB/s, `None` when the iteration failed
    pub speed_mib: Option<f64>,

    /// Why the iteration failed
    pub error: Option<String>,

    /// Last stage reached before teardown
    pub stage: IterationStage,

    /// Ports the tunnels listened on
    pub ports: PortPair,

    /// When the iteration started
    pub started_at: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Create a successful result
    pub fn measured(method: Method, ports: PortPair, speed_mib: f64, started_at: DateTime<Utc>) -> Self {
        Self {
            method,
            speed_mib: Some(speed_mib),
            error: None,
            stage: IterationStage::Measured,
            ports,
            started_at,
        }
    }

    /// Create a failed result
    pub fn failed(
        method: Method,
        ports: PortPair,
        stage: IterationStage,
        error: String,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            method,
            speed_mib: None,
            error: Some(error),
            stage,
            ports,
            started_at,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.speed_mib.is_some()
    }

    /// Throughput in Gbps
    pub fn gbps(&self) -> Option<f64> {
        self.speed_mib.map(mib_to_gbps)
    }
}

/// Ordered results of a run, one entry per method in test order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub results: Vec<BenchmarkResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.results.iter()
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_successful()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.successful_count()
    }

    /// Fastest successful method
    pub fn fastest(&self) -> Option<&BenchmarkResult> {
        self.results
            .iter()
            .filter(|r| r.is_successful())
            .max_by(|a, b| {
                let a_speed = a.speed_mib.unwrap_or(0.0);
                let b_speed = b.speed_mib.unwrap_or(0.0);
                a_speed.partial_cmp(&b_speed).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str) -> Method {
        Method::new(name).unwrap()
    }

    #[test]
    fn test_rate_conversions() {
        let mib = bytes_per_sec_to_mib(12_500_000.0);
        assert!((mib - 11.920928955078125).abs() < 1e-9);
        let gbps = mib_to_gbps(mib);
        assert!((gbps - 0.095367).abs() < 1e-6);
    }

    #[test]
    fn test_result_constructors() {
        let ports = PortPair::new(20000, 15000);
        let ok = BenchmarkResult::measured(method("none"), ports, 1000.0, Utc::now());
        assert!(ok.is_successful());
        assert_eq!(ok.gbps(), Some(8.0));
        assert_eq!(ok.stage, IterationStage::Measured);

        let failed = BenchmarkResult::failed(
            method("aes-256-gcm"),
            ports,
            IterationStage::Configured,
            "server exited".to_string(),
            Utc::now(),
        );
        assert!(!failed.is_successful());
        assert_eq!(failed.gbps(), None);
        assert_eq!(failed.error.as_deref(), Some("server exited"));
    }

    #[test]
    fn test_result_set_counts_and_fastest() {
        let ports = PortPair::new(20000, 15000);
        let mut set = ResultSet::new();
        set.push(BenchmarkResult::measured(method("none"), ports, 900.0, Utc::now()));
        set.push(BenchmarkResult::failed(
            method("aes-128-gcm"),
            ports,
            IterationStage::ServerStarted,
            "boom".to_string(),
            Utc::now(),
        ));
        set.push(BenchmarkResult::measured(method("aes-256-gcm"), ports, 1200.0, Utc::now()));

        assert_eq!(set.len(), 3);
        assert_eq!(set.successful_count(), 2);
        assert_eq!(set.failed_count(), 1);
        assert_eq!(set.fastest().unwrap().method.as_str(), "aes-256-gcm");
    }

    #[test]
    fn test_result_serialization() {
        let result = BenchmarkResult::measured(method("none"), PortPair::new(1, 2), 1.5, Utc::now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "none");
        assert_eq!(json["speed_mib"], 1.5);
        assert_eq!(json["stage"], "measured");
    }
}
