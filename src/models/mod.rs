//! Data models and structures for the tunnel throughput bench

pub mod config;
pub mod method;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use method::{Method, PortPair};
pub use metrics::{BenchmarkResult, ResultSet, bytes_per_sec_to_mib, mib_to_gbps};
