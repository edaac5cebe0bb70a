//! Tunnel Throughput Bench
//!
//! Benchmarks sustained download throughput of sing-box Shadowsocks tunnels
//! for a list of encryption methods. Each method gets a freshly generated
//! server/client config pair, a local process pair, and one timed transfer
//! against a bounded synthetic HTTP stream.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod stream;
pub mod transfer;
pub mod tunnel;
pub mod types;
pub mod workdir;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{BenchmarkResult, Config, Method, PortPair, ResultSet};
pub use driver::{BenchmarkDriver, DriverSettings};
pub use stream::{StreamServer, StreamServerHandle};
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_SINGBOX_PATH: &str = "/usr/bin/sing-box";
    pub const DEFAULT_OPENSSL_PATH: &str = "/usr/bin/openssl";
    pub const DEFAULT_CURL_PATH: &str = "/usr/bin/curl";

    pub const DEFAULT_BASE_CLIENT_PORT: u16 = 15000;
    pub const DEFAULT_BASE_SERVER_PORT: u16 = 20000;
    pub const DEFAULT_HTTP_PORT: u16 = 8000;

    /// Port increment between iterations
    pub const PORT_STRIDE: u16 = 2;

    pub const DEFAULT_DURATION_SECS: u64 = 12;
    /// Hard cap on bytes served per stream request (8 GiB)
    pub const DEFAULT_MAX_TEST_BYTES: u64 = 8 << 30;
    pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;
    pub const STREAM_PATH: &str = "/bench";

    /// Delay after spawning a tunnel before checking it is still alive
    pub const SETTLE_WINDOW: Duration = Duration::from_millis(800);
    /// Delay after both tunnels are up before the transfer starts
    pub const STABILIZE_DELAY: Duration = Duration::from_millis(1200);
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(4);
    pub const PORT_RELEASE_DELAY: Duration = Duration::from_millis(400);
    /// Extra time allowed on top of the benchmark duration for a transfer
    pub const TRANSFER_GRACE: Duration = Duration::from_secs(2);
    pub const SERVER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

    pub const DEFAULT_METHODS: &[&str] = &[
        "none",
        "aes-128-gcm",
        "aes-256-gcm",
        "chacha20-ietf-poly1305",
        "2022-blake3-aes-128-gcm",
        "2022-blake3-aes-256-gcm",
    ];
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
