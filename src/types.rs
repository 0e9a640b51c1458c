//! Type definitions and aliases

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Transport protocols the probe can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Protocol name as used on the command line and in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Icmp => "icmp",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }

    /// Upper-case label used in the ping-style header and statistics block
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Icmp => "ICMP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Sctp => "SCTP",
        }
    }

    /// All supported client protocols
    pub fn all() -> &'static [Protocol] {
        &[Protocol::Icmp, Protocol::Udp, Protocol::Tcp, Protocol::Sctp]
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "icmp" => Ok(Protocol::Icmp),
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            _ => Err(AppError::validation(format!("Unsupported parameter protocol={}", s))),
        }
    }
}

/// IP protocol version of the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Derive the version from textual address syntax: anything with a colon is IPv6
    pub fn from_host(host: &str) -> Self {
        if host.contains(':') {
            IpVersion::V6
        } else {
            IpVersion::V4
        }
    }

    /// Version of a parsed address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Numeric version (4 or 6)
    pub fn number(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Whether an address belongs to this version
    pub fn matches(&self, addr: &IpAddr) -> bool {
        IpVersion::of(addr) == *self
    }

    /// Socket domain for this version
    pub fn domain(&self) -> socket2::Domain {
        match self {
            IpVersion::V4 => socket2::Domain::IPV4,
            IpVersion::V6 => socket2::Domain::IPV6,
        }
    }

    /// Unspecified ("all interfaces") address for this version
    pub fn unspecified(&self) -> IpAddr {
        match self {
            IpVersion::V4 => IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
            IpVersion::V6 => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

/// UDP addressing mode, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UdpMode {
    /// Connected socket expecting a unicast echo
    Unicast,
    /// Group traffic on a named interface
    Multicast,
    /// Limited broadcast (IPv4 only)
    Broadcast,
}

impl UdpMode {
    /// Mode name for log output
    pub fn as_str(&self) -> &'static str {
        match self {
            UdpMode::Unicast => "unicast",
            UdpMode::Multicast => "multicast",
            UdpMode::Broadcast => "broadcast",
        }
    }
}

impl Default for UdpMode {
    fn default() -> Self {
        UdpMode::Unicast
    }
}
