//! Core formatting trait and the plain text implementation

use crate::{
    error::Result,
    models::{BenchmarkResult, Method, ResultSet},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Banner printed before a method's iteration
    fn format_method_header(&self, method: &Method) -> Result<String>;

    /// Per-method line printed once its iteration finished
    fn format_interim(&self, result: &BenchmarkResult) -> Result<String>;

    /// Final table, one row per result in run order
    fn format_summary(&self, results: &ResultSet) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show failure reasons and ports
    pub verbose_mode: bool,
    /// Width of the summary rules
    pub rule_width: usize,
    /// Width of the method column
    pub method_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            rule_width: 40,
            method_width: 32,
        }
    }
}

/// Cell text for one summary row
pub(crate) fn summary_cells(result: &BenchmarkResult) -> Option<(String, String)> {
    let speed = result.speed_mib?;
    let gbps = result.gbps()?;
    Some((format!("{:6.1} MiB/s", speed), format!("{:5.2} Gbps", gbps)))
}

/// Interim rate line without leading indent
pub(crate) fn interim_rate(speed: f64, gbps: f64) -> String {
    format!("{:6.1} MiB/s   ≈ {:5.2} Gbps", speed, gbps)
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_method_header(&self, method: &Method) -> Result<String> {
        Ok(format!("\n=== {} ===", method))
    }

    fn format_interim(&self, result: &BenchmarkResult) -> Result<String> {
        let mut output = String::new();
        match (result.speed_mib, result.gbps()) {
            (Some(speed), Some(gbps)) => write!(output, "  {}", interim_rate(speed, gbps))?,
            _ => {
                write!(output, "  FAILED")?;
                if let Some(error) = &result.error {
                    write!(output, "\n  reason: {}", error)?;
                }
            }
        }
        if self.options.verbose_mode {
            write!(output, "\n  ports: {}", result.ports)?;
        }
        Ok(output)
    }

    fn format_summary(&self, results: &ResultSet) -> Result<String> {
        let width = self.options.method_width;
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "{}", "=".repeat(self.options.rule_width))?;
        writeln!(output, "           SUMMARY")?;
        writeln!(output, "{}", "-".repeat(self.options.rule_width))?;

        for result in results.iter() {
            match summary_cells(result) {
                Some((speed, gbps)) => {
                    writeln!(output, "{:width$} {}  {}", result.method.as_str(), speed, gbps, width = width)?
                }
                None => writeln!(output, "{:width$} FAILED", result.method.as_str(), width = width)?,
            }
        }

        write!(output, "{}", "-".repeat(self.options.rule_width))?;
        Ok(output)
    }
}
