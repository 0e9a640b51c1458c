//! Output formatting and display system
//!
//! Probers print ping-style lines while they run: a header, one line per
//! probe, the statistics block, and finally the verdict. Formatting is
//! behind [`OutputFormatter`] so the same run renders plain or colored.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use formatter::{FormattingOptions, OutputFormatter, PlainFormatter};

use crate::{
    error::Result,
    models::{ProbeOutcome, RunStatistics},
    types::Protocol,
    verdict::Verdict,
};
use std::sync::Arc;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
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

/// Where printed lines go
#[derive(Clone)]
enum Sink {
    Stdout,
    Discard,
}

/// Prints a run's lines through one formatter.
///
/// Cheap to clone; every prober holds its own handle.
#[derive(Clone)]
pub struct OutputCoordinator {
    formatter: Arc<dyn OutputFormatter>,
    sink: Sink,
}

impl OutputCoordinator {
    /// Create a new output coordinator printing to stdout
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self {
            formatter: Arc::from(formatter),
            sink: Sink::Stdout,
        }
    }

    /// Coordinator for the given color and verbosity preferences
    pub fn from_preferences(enable_color: bool, verbose: bool) -> Self {
        Self::new(OutputFormatterFactory::create_formatter(enable_color, verbose))
    }

    /// Coordinator that formats but prints nothing, for library callers and tests
    pub fn silent() -> Self {
        Self {
            formatter: Arc::from(OutputFormatterFactory::create_plain_formatter()),
            sink: Sink::Discard,
        }
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    fn emit(&self, text: &str) {
        if let Sink::Stdout = self.sink {
            println!("{}", text);
        }
    }

    /// Display the header before the first probe
    pub fn display_header(&self, protocol: Protocol, target: &str, mtu: usize) -> Result<()> {
        let text = self.formatter.format_header(protocol, target, mtu)?;
        self.emit(&text);
        Ok(())
    }

    /// Display one probe result
    pub fn display_probe(&self, protocol: Protocol, outcome: &ProbeOutcome) -> Result<()> {
        let text = self.formatter.format_probe(protocol, outcome)?;
        self.emit(&text);
        Ok(())
    }

    /// Display the statistics block
    pub fn display_statistics(&self, protocol: Protocol, target: &str, stats: &RunStatistics) -> Result<()> {
        let text = self.formatter.format_statistics(protocol, target, stats)?;
        self.emit(&text);
        Ok(())
    }

    /// Display the final verdict
    pub fn display_verdict(&self, verdict: &Verdict) -> Result<()> {
        let text = self.formatter.format_verdict(verdict)?;
        self.emit(&text);
        Ok(())
    }

    /// Display an error message
    pub fn display_error(&self, error: &str) -> Result<()> {
        let text = self.formatter.format_error(error)?;
        self.emit(&text);
        Ok(())
    }
}
