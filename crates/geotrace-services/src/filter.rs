//! Decides whether an address is worth a geolocation lookup.
//!
//! Bogus addresses:
//!   malformed (anything but four decimal octets without leading zeros)
//!   0.0.0.0/8, 127.0.0.0/8, 255.255.255.255
//!   10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
//!   169.254.0.0/16, 224.0.0.0/4, 240.0.0.0/4

use std::net::Ipv4Addr;

/// True if `address` is a well-formed, publicly routable IPv4 address.
pub fn is_routable(address: &str) -> bool {
    let Ok(ip) = address.parse::<Ipv4Addr>() else {
        return false;
    };

    let [first, ..] = ip.octets();
    !(first == 0
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || first >= 240)
}
