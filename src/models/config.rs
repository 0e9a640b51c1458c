//! Configuration data model and per-run test parameters

use crate::logging::LogFormat;
use crate::types::{AppError, IpVersion, Protocol, Result, UdpMode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Main application configuration, merged from defaults, `.env`, environment and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Protocol to test or serve
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Run a server instead of a client test
    #[serde(default)]
    pub listen: bool,

    /// Destination address (client) or listen address (server)
    #[serde(default)]
    pub server: Option<String>,

    /// Destination or listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Payload size in bytes
    #[serde(default = "default_mtu")]
    pub mtu: usize,

    /// Network interface / VRF name
    #[serde(default)]
    pub interface: Option<String>,

    /// UDP multicast mode
    #[serde(default)]
    pub multicast: bool,

    /// UDP broadcast mode
    #[serde(default)]
    pub broadcast: bool,

    /// Expect the path to be blocked
    #[serde(default)]
    pub negative: bool,

    /// Number of probes per run
    #[serde(default = "default_packet_count")]
    pub packet_count: u32,

    /// Per-probe deadline
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Pause before every probe
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// SCTP outbound/inbound stream count
    #[serde(default = "default_sctp_streams")]
    pub sctp_streams: u16,

    /// Keep the UDP server running after a failed read or write
    #[serde(default)]
    pub keep_going: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: None,
            listen: false,
            server: None,
            port: default_port(),
            mtu: default_mtu(),
            interface: None,
            multicast: false,
            broadcast: false,
            negative: false,
            packet_count: default_packet_count(),
            timeout_seconds: default_timeout_secs(),
            probe_interval_ms: default_probe_interval_ms(),
            sctp_streams: default_sctp_streams(),
            keep_going: false,
            enable_color: default_enable_color(),
            log_format: LogFormat::default(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get probe interval as Duration
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Non-empty server address, if any
    pub fn server_address(&self) -> Option<&str> {
        self.server.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Non-empty interface name, if any
    pub fn interface_name(&self) -> Option<&str> {
        self.interface.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// IP version derived from the server address syntax
    pub fn ip_version(&self) -> IpVersion {
        IpVersion::from_host(self.server_address().unwrap_or(""))
    }

    /// Selected UDP mode
    pub fn udp_mode(&self) -> UdpMode {
        if self.multicast {
            UdpMode::Multicast
        } else if self.broadcast {
            UdpMode::Broadcast
        } else {
            UdpMode::Unicast
        }
    }

    /// Validate the configuration and return the first error
    pub fn validate(&self) -> Result<()> {
        let protocol = self.protocol
            .ok_or_else(|| AppError::validation("Unsupported parameter protocol="))?;

        validate_int_in_range(self.mtu as u64, crate::defaults::MIN_MTU as u64, crate::defaults::MAX_MTU as u64)
            .map_err(|e| AppError::validation(format!("unsupported parameter mtu={} {}", self.mtu, e)))?;

        if self.listen && protocol == Protocol::Icmp {
            return Err(AppError::validation("Unsupported parameter protocol=icmp in server mode"));
        }

        if self.multicast && self.broadcast {
            return Err(AppError::validation("--multicast and --broadcast are mutually exclusive"));
        }

        if (self.multicast || self.broadcast) && protocol != Protocol::Udp {
            return Err(AppError::validation(format!(
                "{} mode is only supported with protocol=udp",
                self.udp_mode().as_str()
            )));
        }

        if self.packet_count == 0 {
            return Err(AppError::validation("Packet count must be greater than 0"));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::validation("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > 300 {
            return Err(AppError::validation("Timeout cannot exceed 300 seconds"));
        }

        if self.sctp_streams == 0 {
            return Err(AppError::validation("SCTP stream count must be greater than 0"));
        }

        let needs_port = self.listen || protocol != Protocol::Icmp;
        if needs_port {
            validate_int_in_range(
                u64::from(self.port),
                u64::from(crate::defaults::MIN_PORT),
                u64::from(crate::defaults::MAX_PORT),
            )
            .map_err(|e| AppError::validation(format!("unsupported parameter port={} {}", self.port, e)))?;
        }

        let needs_address = (!self.listen && !self.broadcast) || self.multicast;
        if needs_address || self.server_address().is_some() {
            self.parse_server_address()?;
        }

        if self.broadcast && self.ip_version() == IpVersion::V6 {
            return Err(AppError::validation("Broadcast is only supported over IPv4"));
        }

        Ok(())
    }

    /// Parse the server address, enforcing multicast scope when requested
    pub fn parse_server_address(&self) -> Result<IpAddr> {
        let host = self.server_address().unwrap_or("");
        let ip: Option<IpAddr> = host.parse().ok();
        if self.multicast {
            return match ip {
                Some(ip) if ip.is_multicast() => Ok(ip),
                _ => Err(AppError::validation(format!(
                    "Unsupported parameter server ip={} is not multicast address",
                    host
                ))),
            };
        }
        ip.ok_or_else(|| AppError::validation(format!("Unsupported parameter server ip={}", host)))
    }

    /// Build the immutable parameters for one test or server run
    pub fn test_parameters(&self) -> Result<TestParameters> {
        let protocol = self.protocol
            .ok_or_else(|| AppError::validation("Unsupported parameter protocol="))?;

        let target = match self.server_address() {
            Some(_) => self.parse_server_address()?,
            None if self.broadcast => IpAddr::V4(crate::defaults::IPV4_BROADCAST_ADDRESS),
            None if self.listen => self.ip_version().unspecified(),
            None => return Err(AppError::validation("Unsupported parameter server ip=")),
        };

        let mut params = TestParameters::new(protocol, target, self.port)
            .with_mtu(self.mtu)
            .with_packet_count(self.packet_count)
            .with_timeout(self.timeout())
            .with_probe_interval(self.probe_interval())
            .with_negative(self.negative)
            .with_udp_mode(self.udp_mode())
            .with_sctp_streams(self.sctp_streams);

        if let Some(name) = self.interface_name() {
            params = params.with_interface(name);
        }

        Ok(params)
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(count) = std::env::var("PROBE_COUNT") {
            self.packet_count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(timeout) = std::env::var("PROBE_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(interval) = std::env::var("PROBE_INTERVAL_MS") {
            self.probe_interval_ms = interval.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_INTERVAL_MS value '{}': {}", interval, e)))?;
        }

        if let Ok(mtu) = std::env::var("PROBE_MTU") {
            self.mtu = mtu.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_MTU value '{}': {}", mtu, e)))?;
        }

        if let Ok(interface) = std::env::var("PROBE_INTERFACE") {
            let interface = interface.trim();
            if !interface.is_empty() {
                self.interface = Some(interface.to_string());
            }
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.log_format = format.parse()?;
        }

        Ok(())
    }
}

fn validate_int_in_range(value: u64, start: u64, stop: u64) -> std::result::Result<(), String> {
    if value >= start && value <= stop {
        Ok(())
    } else {
        Err(format!("value={} not in range {}...{}", value, start, stop))
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_mtu() -> usize {
    crate::defaults::DEFAULT_MTU
}

fn default_packet_count() -> u32 {
    crate::defaults::DEFAULT_PACKET_COUNT
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_probe_interval_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_INTERVAL.as_millis() as u64
}

fn default_sctp_streams() -> u16 {
    crate::defaults::DEFAULT_SCTP_STREAMS
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

/// Fully resolved parameters of one test or server run.
///
/// Built once and never mutated afterwards; the `with_*` methods consume
/// the value and are only meant for construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestParameters {
    protocol: Protocol,
    mtu: usize,
    ip_version: IpVersion,
    target: IpAddr,
    port: u16,
    packet_count: u32,
    timeout: Duration,
    probe_interval: Duration,
    negative: bool,
    interface: Option<String>,
    udp_mode: UdpMode,
    sctp_streams: u16,
}

impl TestParameters {
    /// Parameters with crate defaults for everything but the endpoint
    pub fn new(protocol: Protocol, target: IpAddr, port: u16) -> Self {
        Self {
            protocol,
            mtu: crate::defaults::DEFAULT_MTU,
            ip_version: IpVersion::of(&target),
            target,
            port,
            packet_count: crate::defaults::DEFAULT_PACKET_COUNT,
            timeout: crate::defaults::DEFAULT_TIMEOUT,
            probe_interval: crate::defaults::DEFAULT_PROBE_INTERVAL,
            negative: false,
            interface: None,
            udp_mode: UdpMode::Unicast,
            sctp_streams: crate::defaults::DEFAULT_SCTP_STREAMS,
        }
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn with_packet_count(mut self, packet_count: u32) -> Self {
        self.packet_count = packet_count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_interval(mut self, probe_interval: Duration) -> Self {
        self.probe_interval = probe_interval;
        self
    }

    pub fn with_negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    pub fn with_interface<S: Into<String>>(mut self, interface: S) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_udp_mode(mut self, udp_mode: UdpMode) -> Self {
        self.udp_mode = udp_mode;
        self
    }

    pub fn with_sctp_streams(mut self, sctp_streams: u16) -> Self {
        self.sctp_streams = sctp_streams;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn packet_count(&self) -> u32 {
        self.packet_count
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    pub fn negative(&self) -> bool {
        self.negative
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn udp_mode(&self) -> UdpMode {
        self.udp_mode
    }

    pub fn sctp_streams(&self) -> u16 {
        self.sctp_streams
    }

    /// Target socket address
    pub fn target_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.target, self.port)
    }

    /// The test payload: exactly `mtu` filler bytes
    pub fn payload(&self) -> Vec<u8> {
        vec![crate::defaults::PAYLOAD_FILLER; self.mtu]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(protocol: Protocol, server: &str) -> Config {
        Config {
            protocol: Some(protocol),
            server: Some(server.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_client_config_is_valid() {
        let config = client(Protocol::Tcp, "192.0.2.10");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_protocol_invalid() {
        let config = Config { server: Some("192.0.2.10".into()), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("protocol"));
    }

    #[test]
    fn test_mtu_range() {
        let mut config = client(Protocol::Udp, "192.0.2.10");
        config.mtu = 49;
        assert!(config.validate().is_err());
        config.mtu = 50;
        assert!(config.validate().is_ok());
        config.mtu = 9000;
        assert!(config.validate().is_ok());
        config.mtu = 9001;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not in range 50...9000"));
    }

    #[test]
    fn test_port_range() {
        let mut config = client(Protocol::Tcp, "192.0.2.10");
        config.port = 0;
        assert!(config.validate().is_err());
        config.port = 65535;
        assert!(config.validate().is_err());
        config.port = 65534;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_icmp_ignores_port() {
        let mut config = client(Protocol::Icmp, "192.0.2.10");
        config.port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_server_address() {
        let config = client(Protocol::Tcp, "not-an-ip");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multicast_requires_group_address() {
        let mut config = client(Protocol::Udp, "192.0.2.10");
        config.multicast = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not multicast address"));

        config.server = Some("239.1.1.1".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_multicast_and_broadcast_conflict() {
        let mut config = client(Protocol::Udp, "239.1.1.1");
        config.multicast = true;
        config.broadcast = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_modes_are_udp_only() {
        let mut config = client(Protocol::Tcp, "239.1.1.1");
        config.multicast = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_mode_without_address() {
        let config = Config {
            protocol: Some(Protocol::Tcp),
            listen: true,
            port: 9000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let params = config.test_parameters().unwrap();
        assert!(params.target().is_unspecified());
        assert_eq!(params.ip_version(), IpVersion::V4);
    }

    #[test]
    fn test_broadcast_targets_limited_broadcast() {
        let config = Config {
            protocol: Some(Protocol::Udp),
            listen: true,
            broadcast: true,
            interface: Some("eth0".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let params = config.test_parameters().unwrap();
        assert_eq!(params.target(), IpAddr::V4(std::net::Ipv4Addr::BROADCAST));
        assert_eq!(params.udp_mode(), UdpMode::Broadcast);
    }

    #[test]
    fn test_broadcast_keeps_configured_address() {
        let config = Config {
            protocol: Some(Protocol::Udp),
            listen: true,
            broadcast: true,
            server: Some("192.0.2.255".into()),
            interface: Some("lo".into()),
            port: 9000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let params = config.test_parameters().unwrap();
        assert_eq!(params.target_addr(), "192.0.2.255:9000".parse().unwrap());

        let invalid = Config { server: Some("not-an-ip".into()), ..config };
        let err = invalid.validate().unwrap_err();
        assert!(err.to_string().contains("server ip=not-an-ip"));
    }

    #[test]
    fn test_test_parameters_from_config() {
        let mut config = client(Protocol::Udp, "2001:db8::1");
        config.mtu = 100;
        config.packet_count = 3;
        config.negative = true;
        config.interface = Some("  ".into());

        let params = config.test_parameters().unwrap();
        assert_eq!(params.ip_version(), IpVersion::V6);
        assert_eq!(params.mtu(), 100);
        assert_eq!(params.packet_count(), 3);
        assert!(params.negative());
        assert_eq!(params.interface(), None);
        assert_eq!(params.payload().len(), 100);
        assert!(params.payload().iter().all(|&b| b == b'a'));
    }

    #[test]
    fn test_icmp_has_no_server_mode() {
        let config = Config {
            protocol: Some(Protocol::Icmp),
            listen: true,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("protocol=icmp"));
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = client(Protocol::Tcp, "192.0.2.10");
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());
        config.timeout_seconds = 301;
        assert!(config.validate().is_err());
    }
}
