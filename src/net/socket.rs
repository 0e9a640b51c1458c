//! Socket configurator
//!
//! Applies the OS-level options every probe and server socket needs before
//! any I/O happens: path-MTU discovery ("don't fragment"), SCTP fragmentation
//! and association setup, interface/VRF binding and send/receive timeouts.
//! Every failure is returned as [`AppError::SocketOption`]; a test that ran
//! with half its options applied would measure the wrong thing.

use crate::error::{AppError, Result};
use crate::types::{IpVersion, Protocol};
use socket2::{Socket, Type};
use std::time::Duration;

/// SCTP level and option numbers from `<netinet/sctp.h>`
pub const IPPROTO_SCTP: i32 = 132;
const SOL_SCTP: i32 = IPPROTO_SCTP;
const SCTP_INITMSG: i32 = 2;
const SCTP_DISABLE_FRAGMENTS: i32 = 8;

/// `struct sctp_initmsg`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SctpInitMsg {
    pub num_ostreams: u16,
    pub max_instreams: u16,
    pub max_attempts: u16,
    pub max_init_timeo: u16,
}

impl SctpInitMsg {
    /// Same stream count in both directions, kernel default init timeout
    pub fn new(streams: u16, max_attempts: u16) -> Self {
        Self {
            num_ostreams: streams,
            max_instreams: streams,
            max_attempts,
            max_init_timeo: 0,
        }
    }
}

/// Options applied to one socket, in the order [`configure`] applies them
#[derive(Debug, Clone, PartialEq)]
pub struct SocketOptions<'a> {
    pub protocol: Protocol,
    pub ip_version: IpVersion,
    pub interface: Option<&'a str>,
    pub timeout: Option<Duration>,
}

impl<'a> SocketOptions<'a> {
    pub fn new(protocol: Protocol, ip_version: IpVersion) -> Self {
        Self {
            protocol,
            ip_version,
            interface: None,
            timeout: None,
        }
    }

    pub fn interface(mut self, interface: Option<&'a str>) -> Self {
        self.interface = interface;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Create an unconnected socket of the right type for `protocol`
pub fn new_socket(protocol: Protocol, ip_version: IpVersion) -> Result<Socket> {
    let (ty, proto) = match protocol {
        Protocol::Tcp => (Type::STREAM, socket2::Protocol::TCP),
        Protocol::Udp => (Type::DGRAM, socket2::Protocol::UDP),
        Protocol::Sctp => (Type::STREAM, socket2::Protocol::from(IPPROTO_SCTP)),
        Protocol::Icmp => {
            return Err(AppError::internal("ICMP tests do not open sockets"));
        }
    };

    Socket::new(ip_version.domain(), ty, Some(proto)).map_err(|e| {
        AppError::socket_option(format!(
            "Failed to create {} {} socket: {}",
            ip_version,
            protocol.label(),
            e
        ))
    })
}

/// Apply fragmentation flags, then the device binding, then timeouts
pub fn configure(socket: &Socket, options: &SocketOptions<'_>) -> Result<()> {
    match options.protocol {
        Protocol::Sctp => disable_sctp_fragments(socket)?,
        _ => set_path_mtu_discovery(socket, options.ip_version)?,
    }

    if let Some(name) = options.interface {
        bind_to_device(socket, name)?;
    }

    if let Some(timeout) = options.timeout {
        set_timeouts(socket, timeout)?;
    }

    Ok(())
}

/// Set the "do not fragment" path-MTU discovery mode for the address family
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_path_mtu_discovery(socket: &Socket, ip_version: IpVersion) -> Result<()> {
    let (level, name, value, label) = match ip_version {
        IpVersion::V4 => (
            libc::IPPROTO_IP,
            libc::IP_MTU_DISCOVER,
            libc::IP_PMTUDISC_DO,
            "IP_MTU_DISCOVER",
        ),
        IpVersion::V6 => (
            libc::IPPROTO_IPV6,
            libc::IPV6_MTU_DISCOVER,
            libc::IPV6_PMTUDISC_DO,
            "IPV6_MTU_DISCOVER",
        ),
    };

    setsockopt(socket, level, name, &value)
        .map_err(|e| AppError::socket_option(format!("setsockopt({}) error: {}", label, e)))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn set_path_mtu_discovery(_socket: &Socket, _ip_version: IpVersion) -> Result<()> {
    Err(AppError::socket_option("Path MTU discovery is not supported on this platform"))
}

/// Restrict the socket to one interface or VRF
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn bind_to_device(socket: &Socket, name: &str) -> Result<()> {
    socket
        .bind_device(Some(name.as_bytes()))
        .map_err(|e| AppError::socket_option(format!("setsockopt(SO_BINDTODEVICE={}) error: {}", name, e)))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn bind_to_device(_socket: &Socket, name: &str) -> Result<()> {
    Err(AppError::socket_option(format!(
        "Binding to device {} is not supported on this platform",
        name
    )))
}

/// Set `SO_SNDTIMEO` and `SO_RCVTIMEO`
pub fn set_timeouts(socket: &Socket, timeout: Duration) -> Result<()> {
    socket
        .set_write_timeout(Some(timeout))
        .map_err(|e| AppError::socket_option(format!("setsockopt(SO_SNDTIMEO) error: {}", e)))?;
    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| AppError::socket_option(format!("setsockopt(SO_RCVTIMEO) error: {}", e)))
}

/// Refuse to fragment user messages at the association level
#[cfg(unix)]
pub fn disable_sctp_fragments(socket: &Socket) -> Result<()> {
    let on: libc::c_int = 1;
    setsockopt(socket, SOL_SCTP, SCTP_DISABLE_FRAGMENTS, &on)
        .map_err(|e| AppError::socket_option(format!("setsockopt(SCTP_DISABLE_FRAGMENTS) error: {}", e)))
}

#[cfg(not(unix))]
pub fn disable_sctp_fragments(_socket: &Socket) -> Result<()> {
    Err(AppError::socket_option("SCTP is not supported on this platform"))
}

/// Stream counts and INIT retry limit for new associations
#[cfg(unix)]
pub fn set_sctp_init_msg(socket: &Socket, init: &SctpInitMsg) -> Result<()> {
    setsockopt(socket, SOL_SCTP, SCTP_INITMSG, init)
        .map_err(|e| AppError::socket_option(format!("setsockopt(SCTP_INITMSG) error: {}", e)))
}

#[cfg(not(unix))]
pub fn set_sctp_init_msg(_socket: &Socket, _init: &SctpInitMsg) -> Result<()> {
    Err(AppError::socket_option("SCTP is not supported on this platform"))
}

#[cfg(unix)]
fn setsockopt<T>(socket: &Socket, level: libc::c_int, name: libc::c_int, value: &T) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            value as *const T as *const libc::c_void,
            std::mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn getsockopt_int(socket: &Socket, level: libc::c_int, name: libc::c_int) -> std::io::Result<libc::c_int> {
    use std::os::unix::io::AsRawFd;

    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(value)
}

/// Current path-MTU discovery mode, used to verify [`set_path_mtu_discovery`]
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn path_mtu_discovery_mode(socket: &Socket, ip_version: IpVersion) -> Result<i32> {
    let (level, name) = match ip_version {
        IpVersion::V4 => (libc::IPPROTO_IP, libc::IP_MTU_DISCOVER),
        IpVersion::V6 => (libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER),
    };
    getsockopt_int(socket, level, name)
        .map_err(|e| AppError::socket_option(format!("getsockopt(MTU_DISCOVER) error: {}", e)))
}
