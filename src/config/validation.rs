//! Configuration validation warnings
//!
//! `Config::validate` rejects what cannot run; the validator here adds
//! non-fatal warnings about settings that will run but probably not the way
//! the user expects.

use crate::{
    error::Result,
    models::Config,
    types::{Protocol, UdpMode},
};
use colored::Colorize;

/// Largest payload that fits a standard 1500-byte Ethernet frame over IPv4 UDP
const ETHERNET_UDP_PAYLOAD: usize = 1472;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_mode_flags(config));
        warnings.extend(Self::validate_target(config));
        warnings.extend(Self::validate_probe_settings(config));
        Ok(warnings)
    }

    /// Flags that are accepted but have no effect in the selected mode
    fn validate_mode_flags(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let protocol = config.protocol;

        if config.listen && config.negative {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "--negative has no effect in server mode".to_string(),
            ));
        }

        if config.keep_going && !(config.listen && protocol == Some(Protocol::Udp) && config.udp_mode() == UdpMode::Unicast) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "--keep-going only applies to the UDP unicast server".to_string(),
            ));
        }

        if config.listen
            && protocol == Some(Protocol::Udp)
            && config.udp_mode() == UdpMode::Unicast
            && config.server_address().is_some()
        {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "UDP unicast server listens on all interfaces; --server is ignored".to_string(),
            ));
        }

        if protocol != Some(Protocol::Sctp) && config.sctp_streams != crate::defaults::DEFAULT_SCTP_STREAMS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "--sctp-streams only applies to SCTP".to_string(),
            ));
        }

        warnings
    }

    /// Warnings about the target address
    fn validate_target(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if config.listen {
            return warnings;
        }

        if let Ok(ip) = config.parse_server_address() {
            if ip.is_loopback() && config.interface_name().is_some() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Target {} is loopback but an interface is bound; probes may not reach it", ip),
                ));
            } else if ip.is_loopback() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Target {} is a loopback address", ip),
                ));
            }
        }

        warnings
    }

    /// Validate probe count, timing and payload size
    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.mtu > ETHERNET_UDP_PAYLOAD {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "MTU {} exceeds a standard Ethernet payload; fragmentation is disabled so the path must carry jumbo frames",
                    config.mtu
                ),
            ));
        }

        if config.packet_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Probe count of {} may not provide reliable statistics (recommended: >= 3)",
                    config.packet_count
                ),
            ));
        }

        if config.timeout_seconds > 60 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long timeout of {}s will slow down failure detection", config.timeout_seconds),
            ));
        }

        let expected = config.probe_interval().as_secs_f64() * f64::from(config.packet_count);
        if expected > 300.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Run will take at least {:.0}s", expected),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
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
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = match (use_color, &self.level) {
            (false, _) => tag,
            (true, ValidationLevel::Info) => tag.blue().to_string(),
            (true, ValidationLevel::Warning) => tag.yellow().to_string(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
