//! Network interface resolution
//!
//! Looks an interface up by name once, at construction time of a test or
//! server, and keeps its index and addresses for binding, multicast
//! membership and source-address selection.

use crate::error::{AppError, Result};
use crate::types::IpVersion;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A resolved OS network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundInterface {
    name: String,
    index: u32,
    addresses: Vec<IpAddr>,
}

impl BoundInterface {
    /// Resolve `name`, failing when no such interface exists
    pub fn resolve(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::interface("Interface name is empty"));
        }

        let c_name = CString::new(name)
            .map_err(|_| AppError::interface(format!("Invalid interface name {:?}", name)))?;

        let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
        if index == 0 {
            return Err(AppError::interface(format!(
                "Interface {} not found: {}",
                name,
                std::io::Error::last_os_error()
            )));
        }

        let addresses = interface_addresses(name)?;

        Ok(Self {
            name: name.to_string(),
            index,
            addresses,
        })
    }

    /// Build from already known parts
    pub fn from_parts<S: Into<String>>(name: S, index: u32, addresses: Vec<IpAddr>) -> Self {
        Self {
            name: name.into(),
            index,
            addresses,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn addresses(&self) -> &[IpAddr] {
        &self.addresses
    }

    /// Source address for transmitting with `version`
    pub fn source_address(&self, version: IpVersion) -> Result<IpAddr> {
        select_source_address(&self.addresses, version).ok_or_else(|| {
            AppError::interface(format!(
                "Failed to find {} address on interface {}",
                version, self.name
            ))
        })
    }
}

/// Pick the first address of `version`, never an IPv6 link-local one
pub fn select_source_address(addresses: &[IpAddr], version: IpVersion) -> Option<IpAddr> {
    addresses
        .iter()
        .copied()
        .filter(|addr| version.matches(addr))
        .find(|addr| match addr {
            IpAddr::V4(_) => true,
            IpAddr::V6(v6) => !is_ipv6_link_local(v6),
        })
}

/// `fe80::/10`
pub fn is_ipv6_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

fn interface_addresses(name: &str) -> Result<Vec<IpAddr>> {
    let mut ifaddrs_ptr: *mut libc::ifaddrs = std::ptr::null_mut();
    let rc = unsafe { libc::getifaddrs(&mut ifaddrs_ptr) };
    if rc != 0 {
        return Err(AppError::interface(format!(
            "getifaddrs failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    let mut addresses = Vec::new();
    let mut current = ifaddrs_ptr;
    while !current.is_null() {
        let ifaddr = unsafe { &*current };
        current = ifaddr.ifa_next;

        if ifaddr.ifa_addr.is_null() {
            continue;
        }

        let if_name = unsafe { CStr::from_ptr(ifaddr.ifa_name) };
        if if_name.to_bytes() != name.as_bytes() {
            continue;
        }

        let family = libc::c_int::from(unsafe { (*ifaddr.ifa_addr).sa_family });
        if family == libc::AF_INET {
            let sin = unsafe { &*(ifaddr.ifa_addr as *const libc::sockaddr_in) };
            addresses.push(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))));
        } else if family == libc::AF_INET6 {
            let sin6 = unsafe { &*(ifaddr.ifa_addr as *const libc::sockaddr_in6) };
            addresses.push(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)));
        }
    }

    unsafe { libc::freeifaddrs(ifaddrs_ptr) };
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_link_local_detection() {
        assert!(is_ipv6_link_local(&"fe80::1".parse().unwrap()));
        assert!(is_ipv6_link_local(&"febf::1".parse().unwrap()));
        assert!(!is_ipv6_link_local(&"fec0::1".parse().unwrap()));
        assert!(!is_ipv6_link_local(&"2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_select_source_address_skips_link_local() {
        let addrs = vec![ip("fe80::1"), ip("192.0.2.1"), ip("2001:db8::5")];
        assert_eq!(select_source_address(&addrs, IpVersion::V6), Some(ip("2001:db8::5")));
        assert_eq!(select_source_address(&addrs, IpVersion::V4), Some(ip("192.0.2.1")));
    }

    #[test]
    fn test_select_source_address_none_matching() {
        let addrs = vec![ip("fe80::1"), ip("192.0.2.1")];
        assert_eq!(select_source_address(&addrs, IpVersion::V6), None);
        assert_eq!(select_source_address(&[], IpVersion::V4), None);

        let iface = BoundInterface::from_parts("eth9", 9, addrs);
        let err = iface.source_address(IpVersion::V6).unwrap_err();
        assert_eq!(err.category(), "INTERFACE");
    }

    #[test]
    fn test_resolve_loopback() {
        let lo = BoundInterface::resolve("lo").unwrap();
        assert_eq!(lo.name(), "lo");
        assert!(lo.index() > 0);
        assert!(lo.addresses().contains(&ip("127.0.0.1")));
        assert_eq!(lo.source_address(IpVersion::V4).unwrap(), ip("127.0.0.1"));
    }

    #[test]
    fn test_resolve_unknown_interface() {
        let err = BoundInterface::resolve("nosuchdev0").unwrap_err();
        assert!(err.to_string().contains("nosuchdev0"));
        assert!(BoundInterface::resolve("  ").is_err());
    }
}
