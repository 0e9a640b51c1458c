//! netprobe
//!
//! A multi-protocol connectivity probe. The client side sends MTU-sized test
//! traffic over ICMP, TCP, UDP or SCTP and decides pass/fail (optionally as a
//! negative test); the server side provides the matching echo servers, sinks
//! and a multicast/broadcast transmitter.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod net;
pub mod output;
pub mod protocols;
pub mod servers;
pub mod stats;
pub mod types;
pub mod verdict;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, ProbeOutcome, RunStatistics, TestParameters};
pub use protocols::{ConnectivityTest, RunOutcome};
pub use verdict::Verdict;

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_MTU: usize = 1450;
    pub const MIN_MTU: usize = 50;
    pub const MAX_MTU: usize = 9000;
    pub const DEFAULT_PORT: u16 = 80;
    pub const MIN_PORT: u16 = 1;
    pub const MAX_PORT: u16 = 65534;
    pub const DEFAULT_PACKET_COUNT: u32 = 5;
    /// Per-probe read/write deadline
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    /// Sleep before every probe so samples never overlap
    pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);
    pub const TCP_DIAL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const UDP_SERVER_WRITE_TIMEOUT: Duration = Duration::from_secs(20);
    pub const TRANSMIT_INTERVAL: Duration = Duration::from_secs(2);
    pub const TRANSMITTER_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_SCTP_STREAMS: u16 = 5;
    pub const SCTP_MAX_INIT_ATTEMPTS: u16 = 4;
    pub const PAYLOAD_FILLER: u8 = b'a';
    pub const IPV4_BROADCAST_ADDRESS: std::net::Ipv4Addr = std::net::Ipv4Addr::BROADCAST;
    /// IPv4 + ICMP header overhead shown in the ping-style header
    pub const HEADER_OVERHEAD: usize = 28;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
