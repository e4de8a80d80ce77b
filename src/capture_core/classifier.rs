//! Address classification - the gate in front of every geo lookup

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressClass {
    Private,
    Routable,
}

/// Classify a textual address
///
/// Unparseable input is `Private` so it never reaches a lookup.
pub fn classify(address: &str) -> AddressClass {
    match address.trim().parse::<IpAddr>() {
        Ok(ip) => classify_ip(ip),
        Err(_) => AddressClass::Private,
    }
}

pub fn classify_ip(ip: IpAddr) -> AddressClass {
    let private = match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    };

    if private {
        AddressClass::Private
    } else {
        AddressClass::Routable
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();

    a == 0                                      // "this" network
        || ip.is_private()                      // 10/8, 172.16/12, 192.168/16
        || ip.is_loopback()                     // 127/8
        || ip.is_link_local()                   // 169.254/16
        || ip.is_documentation()                // 192.0.2/24, 198.51.100/24, 203.0.113/24
        || ip.is_broadcast()
        || (a == 192 && b == 0 && c == 0)       // IETF protocol assignments
        || (a == 198 && (b & 0xfe) == 18)       // benchmarking 198.18/15
        || a >= 240                             // reserved 240/4
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let seg = ip.segments();

    ip.is_unspecified()
        || ip.is_loopback()
        || (seg[0..5] == [0, 0, 0, 0, 0] && seg[5] == 0xffff) // IPv4-mapped
        || (seg[0] == 0x0100 && seg[1..4] == [0, 0, 0])      // discard-only 100::/64
        || (seg[0] == 0x2001 && seg[1] < 0x0200)             // IETF protocol 2001::/23
        || (seg[0] == 0x2001 && seg[1] == 0x0db8)            // documentation
        || (seg[0] & 0xfe00) == 0xfc00                       // unique local fc00::/7
        || (seg[0] & 0xffc0) == 0xfe80 // link local fe80::/10
}
