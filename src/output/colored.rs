//! Colored formatter implementation with terminal color support
//!
//! Layout is identical to the plain formatter; cells are padded before
//! they are colored so escape codes never shift the columns.

use super::formatter::{interim_rate, summary_cells, FormattingOptions, OutputFormatter};
use crate::{
    error::Result,
    models::{BenchmarkResult, Method, ResultSet},
};
use colored::*;
use std::fmt::Write as _;

/// Throughput classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Excellent, // >= 10 Gbps
    Good,      // >= 5 Gbps
    Fair,      // >= 1 Gbps
    Poor,      // >= 0.1 Gbps
    VeryPoor,
}

impl PerformanceLevel {
    pub fn from_gbps(gbps: f64) -> Self {
        if gbps >= 10.0 {
            Self::Excellent
        } else if gbps >= 5.0 {
            Self::Good
        } else if gbps >= 1.0 {
            Self::Fair
        } else if gbps >= 0.1 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub error: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            error: Color::Red,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn strong(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(color)
        } else {
            text.normal()
        }
    }

    fn rule(&self, ch: char) -> ColoredString {
        let line: String = std::iter::repeat(ch).take(self.options.rule_width).collect();
        self.colorize(&line, self.color_scheme.border)
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_method_header(&self, method: &Method) -> Result<String> {
        Ok(format!(
            "\n{} {} {}",
            self.colorize("===", self.color_scheme.border),
            self.strong(method.as_str(), self.color_scheme.header),
            self.colorize("===", self.color_scheme.border)
        ))
    }

    fn format_interim(&self, result: &BenchmarkResult) -> Result<String> {
        let mut output = String::new();
        match (result.speed_mib, result.gbps()) {
            (Some(speed), Some(gbps)) => {
                let level = PerformanceLevel::from_gbps(gbps);
                write!(output, "  {}", self.colorize(&interim_rate(speed, gbps), level.color()))?;
            }
            _ => {
                write!(output, "  {}", self.strong("FAILED", self.color_scheme.error))?;
                if let Some(error) = &result.error {
                    write!(output, "\n  {}", self.colorize(&format!("reason: {}", error), self.color_scheme.muted))?;
                }
            }
        }
        if self.options.verbose_mode {
            write!(output, "\n  {}", self.colorize(&format!("ports: {}", result.ports), self.color_scheme.muted))?;
        }
        Ok(output)
    }

    fn format_summary(&self, results: &ResultSet) -> Result<String> {
        let width = self.options.method_width;
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "{}", self.rule('='))?;
        writeln!(output, "{}", self.strong("           SUMMARY", self.color_scheme.header))?;
        writeln!(output, "{}", self.rule('-'))?;

        for result in results.iter() {
            let name = format!("{:width$}", result.method.as_str(), width = width);
            match (summary_cells(result), result.gbps()) {
                (Some((speed, gbps_cell)), Some(gbps)) => {
                    let color = PerformanceLevel::from_gbps(gbps).color();
                    writeln!(
                        output,
                        "{} {}  {}",
                        self.bold(&name),
                        self.colorize(&speed, color),
                        self.colorize(&gbps_cell, color)
                    )?;
                }
                _ => writeln!(output, "{} {}", self.bold(&name), self.colorize("FAILED", self.color_scheme.error))?,
            }
        }

        write!(output, "{}", self.rule('-'))?;
        Ok(output)
    }
}
