//! Compiled filter expressions and their evaluation over the decode chain.

use std::net::IpAddr;

use crate::decode;
use crate::packet::Packet;
use crate::protocols::{MacAddr, NetworkHeader, layout};

/// Which end of a conversation a primitive looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Source,
    Destination,
    Either,
}

impl Side {
    fn test<T>(
        self,
        source: Option<T>,
        destination: Option<T>,
        mut accept: impl FnMut(T) -> bool,
    ) -> bool {
        match self {
            Side::Source => source.is_some_and(&mut accept),
            Side::Destination => destination.is_some_and(&mut accept),
            Side::Either => source.is_some_and(&mut accept) || destination.is_some_and(accept),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protocol {
    Ip,
    Ip6,
    Tcp,
    Udp,
    Icmp,
    Arp,
    Vlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Protocol(Protocol),
    Host { side: Side, addr: IpAddr },
    Net { side: Side, addr: IpAddr, prefix: u8 },
    Port { side: Side, port: u16 },
    EtherHost { side: Side, mac: MacAddr },
    /// Protocol number carried by the IP header (after IPv6 extensions).
    IpProto(u8),
    /// Wire length at most this many bytes.
    Less(u32),
    /// Wire length at least this many bytes.
    Greater(u32),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub(crate) fn matches(&self, packet: &Packet) -> bool {
        match self {
            Expr::Protocol(protocol) => protocol_matches(*protocol, packet),
            Expr::Host { side, addr } => side.test(
                decode::source_address(packet),
                decode::destination_address(packet),
                |candidate| candidate == *addr,
            ),
            Expr::Net { side, addr, prefix } => side.test(
                decode::source_address(packet),
                decode::destination_address(packet),
                |candidate| in_network(candidate, *addr, *prefix),
            ),
            Expr::Port { side, port } => side.test(
                decode::source_port(packet),
                decode::destination_port(packet),
                |candidate| candidate == *port,
            ),
            Expr::EtherHost { side, mac } => side.test(
                decode::source_mac(packet),
                decode::destination_mac(packet),
                |candidate| candidate == *mac,
            ),
            Expr::IpProto(protocol) => ip_protocol(packet) == Some(*protocol),
            Expr::Less(len) => packet.wire_length() as u64 <= u64::from(*len),
            Expr::Greater(len) => packet.wire_length() as u64 >= u64::from(*len),
            Expr::Not(inner) => !inner.matches(packet),
            Expr::And(left, right) => left.matches(packet) && right.matches(packet),
            Expr::Or(left, right) => left.matches(packet) || right.matches(packet),
        }
    }
}

fn protocol_matches(protocol: Protocol, packet: &Packet) -> bool {
    let transport = |number| decode::transport(packet).is_some_and(|t| t.protocol == number);
    match protocol {
        Protocol::Ip => decode::ip(packet).is_some(),
        Protocol::Ip6 => decode::ip6(packet).is_some(),
        Protocol::Tcp => transport(layout::IPPROTO_TCP),
        Protocol::Udp => transport(layout::IPPROTO_UDP),
        Protocol::Icmp => transport(layout::IPPROTO_ICMP),
        Protocol::Arp => {
            decode::layer3(packet).is_some_and(|layer| layer.ether_type == layout::ETHERTYPE_ARP)
        }
        Protocol::Vlan => decode::layer3(packet).is_some_and(|layer| layer.vlan_id.is_some()),
    }
}

/// The IP protocol number, also for fragments without a transport header.
fn ip_protocol(packet: &Packet) -> Option<u8> {
    match decode::network(packet)? {
        NetworkHeader::V4(ip) => Some(ip.protocol()),
        NetworkHeader::V6(ip6) => {
            let mut remaining = u32::try_from(ip6.as_bytes().len()).unwrap_or(u32::MAX);
            decode::payload_from_ip6(&ip6, &mut remaining).map(|transport| transport.protocol)
        }
    }
}

fn in_network(candidate: IpAddr, network: IpAddr, prefix: u8) -> bool {
    match (candidate, network) {
        (IpAddr::V4(candidate), IpAddr::V4(network)) => {
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            u32::from(candidate) & mask == u32::from(network) & mask
        }
        (IpAddr::V6(candidate), IpAddr::V6(network)) => {
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            u128::from(candidate) & mask == u128::from(network) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::in_network;

    fn addr(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    #[test]
    fn network_prefixes() {
        assert!(in_network(addr("10.1.2.3"), addr("10.0.0.0"), 8));
        assert!(!in_network(addr("11.1.2.3"), addr("10.0.0.0"), 8));
        assert!(in_network(addr("1.2.3.4"), addr("0.0.0.0"), 0));
        assert!(in_network(addr("1.2.3.4"), addr("1.2.3.4"), 32));
        assert!(in_network(addr("2001:db8::1"), addr("2001:db8::"), 32));
        assert!(!in_network(addr("2001:db8::1"), addr("10.0.0.0"), 8));
    }
}
