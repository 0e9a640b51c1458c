//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation producing ping-style probe output.

use crate::{
    error::{AppError, Result},
    models::{ProbeOutcome, RunStatistics},
    types::Protocol,
    verdict::Verdict,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format the line printed before the first probe
    fn format_header(&self, protocol: Protocol, target: &str, mtu: usize) -> Result<String>;

    /// Format one probe result
    fn format_probe(&self, protocol: Protocol, outcome: &ProbeOutcome) -> Result<String>;

    /// Format the statistics block printed after the last probe
    fn format_statistics(&self, protocol: Protocol, target: &str, stats: &RunStatistics) -> Result<String>;

    /// Format the final verdict
    fn format_verdict(&self, verdict: &Verdict) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show the reason next to every lost probe
    pub verbose_mode: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
        }
    }
}

/// `N(M) bytes`: payload size and size on the wire including IP/ICMP headers
pub(crate) fn header_line(protocol: Protocol, target: &str, mtu: usize) -> String {
    format!(
        "{} PING {} {}({}) bytes of data.",
        protocol.label(),
        target,
        mtu,
        mtu + crate::defaults::HEADER_OVERHEAD
    )
}

pub(crate) fn received_line(protocol: Protocol, outcome: &ProbeOutcome) -> String {
    let from = outcome
        .peer
        .map(|peer| peer.to_string())
        .unwrap_or_else(|| "peer".to_string());
    format!(
        "{} bytes from {}: {}_seq={} time={:.3}ms",
        outcome.bytes,
        from,
        protocol.as_str(),
        outcome.sequence,
        outcome.elapsed_ms()
    )
}

pub(crate) fn statistics_title(protocol: Protocol, target: &str) -> String {
    format!("--- {} {} statistics ---", target, protocol.label())
}

pub(crate) fn statistics_line(stats: &RunStatistics) -> String {
    format!(
        "{} packets transmitted, {} received, {} packet loss, time {}ms",
        stats.transmitted,
        stats.received,
        stats.loss_percentage(),
        stats.total_time_ms()
    )
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Options this formatter was built with
    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, protocol: Protocol, target: &str, mtu: usize) -> Result<String> {
        Ok(header_line(protocol, target, mtu))
    }

    fn format_probe(&self, protocol: Protocol, outcome: &ProbeOutcome) -> Result<String> {
        if outcome.received {
            return Ok(received_line(protocol, outcome));
        }

        let mut output = format!("Packet lost: {}_seq={}", protocol.as_str(), outcome.sequence);
        if self.options.verbose_mode {
            if let Some(reason) = &outcome.error_message {
                write!(output, " ({})", reason)
                    .map_err(|e| AppError::io(format!("Failed to format probe: {}", e)))?;
            }
        }
        Ok(output)
    }

    fn format_statistics(&self, protocol: Protocol, target: &str, stats: &RunStatistics) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", statistics_title(protocol, target))
            .map_err(|e| AppError::io(format!("Failed to format statistics: {}", e)))?;
        write!(output, "{}", statistics_line(stats))
            .map_err(|e| AppError::io(format!("Failed to format statistics: {}", e)))?;

        Ok(output)
    }

    fn format_verdict(&self, verdict: &Verdict) -> Result<String> {
        if verdict.passed {
            self.format_success(&verdict.message)
        } else {
            self.format_error(&verdict.message)
        }
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn formatter(verbose: bool) -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: verbose,
        })
    }

    #[test]
    fn test_header_includes_header_overhead() {
        let line = formatter(false).format_header(Protocol::Tcp, "127.0.0.1", 100).unwrap();
        assert_eq!(line, "TCP PING 127.0.0.1 100(128) bytes of data.");
    }

    #[test]
    fn test_probe_lines() {
        let peer = "127.0.0.1:9000".parse().unwrap();
        let ok = ProbeOutcome::received(2, Duration::from_micros(1500), 100, Some(peer));
        let line = formatter(false).format_probe(Protocol::Udp, &ok).unwrap();
        assert_eq!(line, "100 bytes from 127.0.0.1:9000: udp_seq=2 time=1.500ms");

        let lost = ProbeOutcome::lost(3, Duration::from_secs(2), "read timeout");
        assert_eq!(
            formatter(false).format_probe(Protocol::Tcp, &lost).unwrap(),
            "Packet lost: tcp_seq=3"
        );
        assert_eq!(
            formatter(true).format_probe(Protocol::Tcp, &lost).unwrap(),
            "Packet lost: tcp_seq=3 (read timeout)"
        );
    }

    #[test]
    fn test_statistics_block() {
        let stats = RunStatistics {
            transmitted: 5,
            received: 5,
            lost: 0,
            total_time: Duration::from_millis(12),
            started_at: None,
        };
        let block = formatter(false)
            .format_statistics(Protocol::Tcp, "127.0.0.1", &stats)
            .unwrap();
        assert_eq!(
            block,
            "--- 127.0.0.1 TCP statistics ---\n5 packets transmitted, 5 received, 0 packet loss, time 12ms"
        );
    }

    #[test]
    fn test_verdict_lines() {
        let pass = Verdict::evaluate(Protocol::Udp, true, false);
        assert_eq!(formatter(false).format_verdict(&pass).unwrap(), "SUCCESS: UDP test passed");

        let fail = Verdict::evaluate(Protocol::Udp, true, true);
        assert_eq!(
            formatter(false).format_verdict(&fail).unwrap(),
            "ERROR: Negative UDP test failed"
        );
    }
}
