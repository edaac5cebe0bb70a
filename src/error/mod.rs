//! Error handling for the tunnel throughput bench

use thiserror::Error;

/// Custom error types for the tunnel throughput bench
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (config files, work directory, pipes)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (JSON, numbers, URLs)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// A tunnel process exited before the settle window elapsed
    #[error("Process startup error: {0}")]
    ProcessStartup(String),

    /// The transfer tool failed or reported an unusable rate
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// Stream server bind/serve errors
    #[error("Stream server error: {0}")]
    StreamServer(String),

    /// The run was interrupted by the user
    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new process startup error
    pub fn process_startup<S: Into<String>>(message: S) -> Self {
        Self::ProcessStartup(message.into())
    }

    /// Create a new measurement error
    pub fn measurement<S: Into<String>>(message: S) -> Self {
        Self::Measurement(message.into())
    }

    /// Create a new stream server error
    pub fn stream_server<S: Into<String>>(message: S) -> Self {
        Self::StreamServer(message.into())
    }

    /// Create a new interruption error
    pub fn interrupted<S: Into<String>>(message: S) -> Self {
        Self::Interrupted(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::ProcessStartup(_) => "STARTUP",
            Self::Measurement(_) => "MEASURE",
            Self::StreamServer(_) => "STREAM",
            Self::Interrupted(_) => "INTERRUPT",
        }
    }

    /// Whether this error only fails one benchmark iteration (the run goes on)
    pub fn is_iteration_failure(&self) -> bool {
        match self {
            Self::ProcessStartup(_) | Self::Measurement(_) => true,
            Self::Io(_) | Self::Parse(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::StreamServer(_) => false,
            Self::Interrupted(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Interrupted(_) => 1,
            Self::ProcessStartup(_) | Self::Measurement(_) => 2,
            Self::StreamServer(_) => 4,
            Self::Io(_) => 5,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::ProcessStartup(_) | Self::Measurement(_) | Self::StreamServer(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Io(_) | Self::Interrupted(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(error: std::fmt::Error) -> Self {
        Self::io(format!("Failed to format output: {}", error))
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::measurement(format!("Transfer timed out: {}", error))
        } else {
            Self::measurement(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(error: base64::DecodeError) -> Self {
        Self::parse(format!("Base64 decode error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                AppError::Validation(msg) => AppError::Validation(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                AppError::ProcessStartup(msg) => AppError::ProcessStartup(format!("{}: {}", context, msg)),
                AppError::Measurement(msg) => AppError::Measurement(format!("{}: {}", context, msg)),
                AppError::StreamServer(msg) => AppError::StreamServer(format!("{}: {}", context, msg)),
                AppError::Interrupted(msg) => AppError::Interrupted(format!("{}: {}", context, msg)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_iteration_failure());
        assert_eq!(config_error.exit_code(), 1);

        let startup_error = AppError::process_startup("server exited");
        assert_eq!(startup_error.category(), "STARTUP");
        assert!(startup_error.is_iteration_failure());
        assert_eq!(startup_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::measurement("curl returned garbage");
        let display = error.to_string();
        assert!(display.contains("Measurement error"));
        assert!(display.contains("curl returned garbage"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::validation("validation"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::process_startup("startup"),
            AppError::measurement("measure"),
            AppError::stream_server("stream"),
            AppError::interrupted("interrupt"),
        ];

        let expected_categories = [
            "CONFIG", "VALIDATION", "IO", "PARSE", "STARTUP",
            "MEASURE", "STREAM", "INTERRUPT",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::interrupted("test").exit_code(), 1);
        assert_eq!(AppError::measurement("test").exit_code(), 2);
        assert_eq!(AppError::stream_server("test").exit_code(), 4);
        assert_eq!(AppError::io("test").exit_code(), 5);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<f64>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");
        assert!(app_error.to_string().contains("Float parse error"));
    }

    #[test]
    fn test_json_parse_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_error: AppError = json_error.into();
        assert_eq!(app_error.category(), "PARSE");
        assert!(app_error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_context_keeps_category() {
        let result: Result<()> = Err(AppError::process_startup("exit status 1"));
        let error = result.context("server").unwrap_err();
        assert_eq!(error.category(), "STARTUP");
        assert!(error.to_string().contains("server: exit status 1"));

        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let error = io.with_context(|| "writing client-none.json".to_string()).unwrap_err();
        assert_eq!(error.category(), "IO");
        assert!(error.to_string().contains("writing client-none.json"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::config("Test error");
        let formatted_no_color = error.format_for_console(false);
        let formatted_color = error.format_for_console(true);

        assert!(formatted_no_color.contains("[CONFIG]"));
        assert!(formatted_color.contains("CONFIG"));
        assert!(formatted_color.contains("Test error"));
    }
}
