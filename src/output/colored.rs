//! Colored formatter implementation with terminal color support

use crate::{
    error::Result,
    models::{ProbeOutcome, RunStatistics},
    types::Protocol,
    verdict::Verdict,
};
use super::formatter::{
    header_line, received_line, statistics_line, statistics_title, FormattingOptions,
    OutputFormatter,
};
use colored::*;

/// Latency classification of a received probe for color coding
#[derive(Debug, Clone, PartialEq)]
pub enum LatencyLevel {
    Fast,   // < 10ms
    Normal, // 10-100ms
    Slow,   // > 100ms
}

impl LatencyLevel {
    /// Classify a round-trip time in milliseconds
    pub fn from_elapsed_ms(time_ms: f64) -> Self {
        if time_ms < 10.0 {
            LatencyLevel::Fast
        } else if time_ms <= 100.0 {
            LatencyLevel::Normal
        } else {
            LatencyLevel::Slow
        }
    }

    pub fn color(&self) -> Color {
        match self {
            LatencyLevel::Fast => Color::Green,
            LatencyLevel::Normal => Color::Yellow,
            LatencyLevel::Slow => Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
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

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Loss is green only when nothing was lost
    fn loss_color(&self, stats: &RunStatistics) -> Color {
        match stats.loss_percentage() {
            0 => self.color_scheme.success,
            100 => self.color_scheme.error,
            _ => self.color_scheme.warning,
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, protocol: Protocol, target: &str, mtu: usize) -> Result<String> {
        let line = header_line(protocol, target, mtu);
        if self.options.enable_color {
            Ok(line.bold().color(self.color_scheme.header).to_string())
        } else {
            Ok(self.bold(&line).to_string())
        }
    }

    fn format_probe(&self, protocol: Protocol, outcome: &ProbeOutcome) -> Result<String> {
        if outcome.received {
            let level = LatencyLevel::from_elapsed_ms(outcome.elapsed_ms());
            return Ok(self.colorize(&received_line(protocol, outcome), level.color()).to_string());
        }

        let mut line = format!("Packet lost: {}_seq={}", protocol.as_str(), outcome.sequence);
        if self.options.verbose_mode {
            if let Some(reason) = &outcome.error_message {
                line.push_str(&format!(" ({})", reason));
            }
        }
        Ok(self.colorize(&line, self.color_scheme.error).to_string())
    }

    fn format_statistics(&self, protocol: Protocol, target: &str, stats: &RunStatistics) -> Result<String> {
        // The counters line is colored as a whole so it stays greppable
        Ok(format!(
            "{}\n{}",
            self.colorize(&statistics_title(protocol, target), self.color_scheme.muted),
            self.colorize(&statistics_line(stats), self.loss_color(stats))
        ))
    }

    fn format_verdict(&self, verdict: &Verdict) -> Result<String> {
        if verdict.passed {
            self.format_success(&verdict.message)
        } else {
            self.format_error(&verdict.message)
        }
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("✗ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("! {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✓ {}", self.colorize(message, self.color_scheme.success)))
    }
}
