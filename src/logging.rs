//! Structured logging for the tunnel throughput bench
//!
//! This module provides:
//! - Structured log entries with levels, fields and correlation ids
//! - Console and JSON renderings
//! - A `BenchLogger` for tunnel process, transfer and stream server events

use crate::error::{AppError, Result};
use crate::models::{BenchmarkResult, Config, Method, PortPair};
use crate::types::{IterationStage, TunnelRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - the run cannot continue
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID tying together the events of one iteration
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
}

/// Logger with multiple output formats
///
/// Cloning is cheap and clones share the session context.
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger whose level and format follow the run configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        drop(context);

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }
}

/// Builder for a single log entry
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Attach method and port pair of an iteration
    pub fn iteration(self, method: &Method, ports: PortPair) -> Self {
        self.field("method", method.as_str())
            .field("server_port", ports.server)
            .field("client_port", ports.client)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("iteration_failure", error.is_iteration_failure())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for benchmark events
#[derive(Clone)]
pub struct BenchLogger {
    logger: Logger,
}

impl BenchLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("BENCH".to_string(), config),
        }
    }

    /// Wrap an already configured logger
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    /// A logger that prints nothing below `Fatal`
    pub fn quiet() -> Self {
        let mut logger = Logger::new("BENCH".to_string());
        logger.set_level(LogLevel::Fatal);
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Start of one method's iteration; returns its correlation id
    pub async fn log_iteration_start(&self, method: &Method, ports: PortPair) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.logger
            .info(&format!("Benchmarking {} on {}", method, ports))
            .correlation_id(&correlation_id)
            .iteration(method, ports)
            .log()
            .await;
        correlation_id
    }

    pub async fn log_stage(&self, correlation_id: &str, method: &Method, stage: IterationStage) {
        self.logger
            .debug(&format!("{} reached {}", method, stage.as_str()))
            .correlation_id(correlation_id)
            .field("method", method.as_str())
            .field("stage", stage)
            .log()
            .await;
    }

    pub async fn log_configs_written(&self, correlation_id: &str, server: &Path, client: &Path) {
        self.logger
            .debug("Tunnel configs written")
            .correlation_id(correlation_id)
            .field("server_config", server.display().to_string())
            .field("client_config", client.display().to_string())
            .log()
            .await;
    }

    pub async fn log_process_started(&self, correlation_id: &str, role: TunnelRole, config_path: &Path) {
        self.logger
            .info(&format!("{} tunnel running", role))
            .correlation_id(correlation_id)
            .field("role", role)
            .field("config", config_path.display().to_string())
            .log()
            .await;
    }

    pub async fn log_process_stopped(&self, correlation_id: &str, role: TunnelRole) {
        self.logger
            .debug(&format!("{} tunnel stopped", role))
            .correlation_id(correlation_id)
            .field("role", role)
            .log()
            .await;
    }

    /// Failure of any iteration step
    pub async fn log_iteration_failure(&self, correlation_id: &str, method: &Method, stage: IterationStage, error: &AppError) {
        self.logger
            .warn(&format!("{} failed after {}: {}", method, stage.as_str(), error))
            .correlation_id(correlation_id)
            .field("method", method.as_str())
            .field("stage", stage)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn log_result(&self, correlation_id: &str, result: &BenchmarkResult) {
        let message = match result.speed_mib {
            Some(speed) => format!("{} measured {:.1} MiB/s", result.method, speed),
            None => format!("{} produced no measurement", result.method),
        };
        self.logger
            .info(&message)
            .correlation_id(correlation_id)
            .field("method", result.method.as_str())
            .field("speed_mib", result.speed_mib)
            .field("gbps", result.gbps())
            .field("success", result.is_successful())
            .log()
            .await;
    }

    pub async fn log_stream_server_started(&self, addr: SocketAddr, max_bytes: u64) {
        self.logger
            .info(&format!("Stream server listening on {}", addr))
            .field("addr", addr.to_string())
            .field("max_bytes", max_bytes)
            .log()
            .await;
    }

    pub async fn log_stream_server_stopped(&self, graceful: bool) {
        let level = if graceful { LogLevel::Info } else { LogLevel::Warn };
        let message = if graceful {
            "Stream server stopped"
        } else {
            "Stream server did not stop in time and was aborted"
        };
        self.logger.log(level, message).field("graceful", graceful).log().await;
    }

    pub async fn log_stream_server_error(&self, error: &AppError) {
        self.logger
            .error(&format!("Stream server error: {}", error))
            .error_info(error)
            .log()
            .await;
    }
}

/// Creates loggers sharing one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_bench_logger(&self) -> BenchLogger {
        BenchLogger::from_logger(self.create_logger("BENCH").await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_entry() -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("0123456789abcdef".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("key".to_string(), serde_json::Value::String("value".to_string()));
                map
            },
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);

        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
        assert_eq!(quiet.format, LogFormat::Console);
    }

    #[tokio::test]
    async fn test_session_id() {
        let logger = Logger::new("TEST".to_string());
        logger.set_session_id("test-session".to_string()).await;

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("test-session"));
    }

    #[test]
    fn test_log_formats() {
        let entry = sample_entry();
        let config = Config {
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);

        let console = logger.format_console(&entry);
        assert!(console.contains(" INFO [TEST] Test message"));
        assert!(console.contains("[01234567]"));
        assert!(console.contains("key=\"value\""));

        let json: serde_json::Value = serde_json::from_str(&logger.format_json(&entry)).unwrap();
        assert_eq!(json["level"], "Info");
        assert_eq!(json["fields"]["key"], "value");
    }

    #[test]
    fn test_short_correlation_id_not_truncated() {
        let mut entry = sample_entry();
        entry.correlation_id = Some("abc".to_string());
        let logger = Logger::new("TEST".to_string());
        assert!(logger.format_console(&entry).contains("[abc]"));
    }

    #[tokio::test]
    async fn test_bench_logger_events() {
        let logger = BenchLogger::quiet();
        let method = Method::new("aes-128-gcm").unwrap();
        let ports = PortPair::new(20000, 15000);

        let id = logger.log_iteration_start(&method, ports).await;
        assert_eq!(id.len(), 36);
        logger.log_stage(&id, &method, IterationStage::ServerStarted).await;
        logger.log_process_started(&id, TunnelRole::Server, Path::new("/tmp/server.json")).await;
        logger
            .log_iteration_failure(&id, &method, IterationStage::ClientStarted, &AppError::measurement("boom"))
            .await;
        logger.log_process_stopped(&id, TunnelRole::Server).await;
    }

    #[tokio::test]
    async fn test_logger_factory_shares_session() {
        let factory = LoggerFactory::new(Config::default());
        let first = factory.create_logger("TEST").await;
        let second = factory.create_bench_logger().await;
        assert_eq!(first.name, "TEST");

        let first_session = first.context.read().await.session_id.clone();
        let second_session = second.logger().context.read().await.session_id.clone();
        assert!(first_session.is_some());
        assert_eq!(first_session, second_session);
    }
}
