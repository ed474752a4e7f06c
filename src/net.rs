//! Local IPv4 address discovery for the SAN set.

use std::net::Ipv4Addr;

/// Source of the host's externally reachable IPv4 addresses.
pub trait AddressDiscovery: Send + Sync {
    fn discover_local_ipv4(&self) -> Vec<Ipv4Addr>;
}

/// Enumerates the interfaces of the running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl AddressDiscovery for SystemInterfaces {
    fn discover_local_ipv4(&self) -> Vec<Ipv4Addr> {
        discover_local_ipv4()
    }
}

/// A fixed address list, for hosts whose interfaces should not leak into the
/// certificate or for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct FixedAddresses(pub Vec<Ipv4Addr>);

impl AddressDiscovery for FixedAddresses {
    fn discover_local_ipv4(&self) -> Vec<Ipv4Addr> {
        self.0.clone()
    }
}

/// Every IPv4 address bound to a non-loopback interface, in enumeration
/// order with duplicates removed.
///
/// Never fails: an enumeration error or a sandbox without interfaces yields
/// an empty list.
pub fn discover_local_ipv4() -> Vec<Ipv4Addr> {
    let mut found = Vec::new();
    for addr in enumerate_ipv4() {
        if !addr.is_loopback() && !found.contains(&addr) {
            found.push(addr);
        }
    }
    found
}

#[cfg(unix)]
fn enumerate_ipv4() -> Vec<Ipv4Addr> {
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;

    let interfaces = match getifaddrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            log::debug!("Interface enumeration failed, no local IPs added to SAN: {e}");
            return Vec::new();
        }
    };

    interfaces
        .filter(|ifa| !ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK))
        .filter_map(|ifa| {
            ifa.address
                .as_ref()
                .and_then(|addr| addr.as_sockaddr_in())
                .map(|sin| sin.ip())
        })
        .collect()
}

#[cfg(not(unix))]
fn enumerate_ipv4() -> Vec<Ipv4Addr> {
    log::debug!("Interface enumeration unsupported on this platform");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_reports_loopback() {
        let addrs = discover_local_ipv4();
        assert!(addrs.iter().all(|a| !a.is_loopback()));
    }

    #[test]
    fn discovery_has_no_duplicates() {
        let addrs = discover_local_ipv4();
        for (i, a) in addrs.iter().enumerate() {
            assert!(!addrs[i + 1..].contains(a), "{a} reported twice");
        }
    }

    #[test]
    fn fixed_addresses_are_returned_verbatim() {
        let fixed = FixedAddresses(vec![Ipv4Addr::new(10, 0, 0, 7), Ipv4Addr::new(10, 0, 0, 7)]);
        assert_eq!(fixed.discover_local_ipv4().len(), 2);
    }
}
