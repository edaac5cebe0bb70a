//! Configuration validation beyond the hard errors of `Config::validate`

use crate::{
    error::Result,
    models::{Config, Method},
    types::TransferKind,
};
use std::path::Path;
use std::time::Duration;

/// Runs above this estimate are worth a notice
const LONG_RUN: Duration = Duration::from_secs(600);

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Hard validation followed by advisory checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_binaries(config));
        warnings.extend(Self::validate_methods(&config.parsed_methods()?));
        warnings.extend(Self::validate_timing(config));
        warnings.extend(Self::validate_output(config));
        Ok(warnings)
    }

    fn validate_binaries(config: &Config) -> Vec<ValidationWarning> {
        let mut binaries = vec![("sing-box", config.singbox_binary()), ("openssl", config.openssl_binary())];
        if config.transfer == TransferKind::Curl {
            binaries.push(("curl", config.curl_binary()));
        }

        binaries
            .into_iter()
            .filter(|(_, path)| !is_executable(path))
            .map(|(name, path)| {
                ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("{} not found at {}; every method will fail", name, path.display()),
                )
            })
            .collect()
    }

    fn validate_methods(methods: &[Method]) -> Vec<ValidationWarning> {
        methods
            .iter()
            .filter(|method| !method.is_known())
            .map(|method| {
                ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Method '{}' is not in the default list; it gets a {}-byte secret",
                        method,
                        method.secret_len()
                    ),
                )
            })
            .collect()
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.duration_seconds < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Duration of {}s is dominated by connection setup (recommended: >= 5)",
                    config.duration_seconds
                ),
            ));
        }

        if config.max_test_bytes < crate::defaults::STREAM_CHUNK_SIZE as u64 * 100 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Byte ceiling of {} bytes may finish long before the duration elapses",
                    config.max_test_bytes
                ),
            ));
        }

        let estimate = estimated_run_time(config);
        if estimate > LONG_RUN {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Run may take up to {} minutes", estimate.as_secs().div_ceil(60)),
            ));
        }

        warnings
    }

    fn validate_output(config: &Config) -> Vec<ValidationWarning> {
        if config.json_output && (config.verbose || config.debug) {
            vec![ValidationWarning::new(
                ValidationLevel::Warning,
                "Verbose logs go to stdout and will interleave with the JSON report".to_string(),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Upper bound on the wall-clock time of a run
pub fn estimated_run_time(config: &Config) -> Duration {
    let per_method = crate::defaults::SETTLE_WINDOW * 2
        + crate::defaults::STABILIZE_DELAY
        + config.transfer_max_time()
        + crate::defaults::STOP_TIMEOUT * 2
        + crate::defaults::PORT_RELEASE_DELAY;
    per_method * u32::try_from(config.methods.len()).unwrap_or(u32::MAX)
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> colored::Color {
        match self {
            Self::Info => colored::Color::Blue,
            Self::Warning => colored::Color::Yellow,
            Self::Error => colored::Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            use colored::Colorize;
            format!("[{}] {}", self.level.as_str().color(self.level.color()).bold(), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
