//! Output formatting and display system
//!
//! Interim per-method lines and the summary table come from an
//! `OutputFormatter`; `--json` replaces the table with a JSON document.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{FormattingOptions, OutputFormatter, PlainFormatter};

use crate::{
    driver::ProgressObserver,
    error::Result,
    models::{BenchmarkResult, Method, ResultSet},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Machine-readable report of a run
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<JsonResult<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonResult<'a> {
    #[serde(flatten)]
    pub result: &'a BenchmarkResult,
    pub gbps: Option<f64>,
}

impl<'a> JsonReport<'a> {
    pub fn new(results: &'a ResultSet) -> Self {
        Self {
            version: crate::VERSION,
            generated_at: Utc::now(),
            successful: results.successful_count(),
            failed: results.failed_count(),
            results: results
                .iter()
                .map(|result| JsonResult {
                    result,
                    gbps: result.gbps(),
                })
                .collect(),
        }
    }
}

/// Render the result set as pretty JSON
pub fn render_json(results: &ResultSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::new(results))?)
}

/// Prints method banners and interim lines as the run progresses
pub struct ConsoleProgress {
    formatter: Box<dyn OutputFormatter>,
    to_stderr: bool,
}

impl ConsoleProgress {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self {
            formatter,
            to_stderr: false,
        }
    }

    /// Keep stdout free for a machine-readable report
    pub fn on_stderr(mut self) -> Self {
        self.to_stderr = true;
        self
    }

    fn emit(&self, line: Result<String>) {
        let Ok(line) = line else {
            return;
        };
        if self.to_stderr {
            let _ = writeln!(std::io::stderr(), "{}", line);
        } else {
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "{}", line);
            let _ = stdout.flush();
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn method_started(&self, method: &Method) {
        self.emit(self.formatter.format_method_header(method));
    }

    fn method_finished(&self, result: &BenchmarkResult) {
        self.emit(self.formatter.format_interim(result));
    }
}
