//! The protocol decode chain: link layer → network layer → transport layer.
//!
//! Every function here is pure and allocation-free. A missing or truncated
//! layer is reported as `None`, never as an error, and nothing is read past
//! the captured bytes.
//!
//! The `*_from_*` functions take a header already in hand plus a
//! `remaining` budget: on entry the bytes available from the start of that
//! header, on return the bytes available from the start of the result. The
//! budget only ever shrinks, and is set to zero when a header's declared
//! length does not fit it.

use std::net::IpAddr;

use crate::linktype::LinkType;
use crate::packet::Packet;
use crate::protocols::common::FieldReader;
use crate::protocols::layout;
use crate::protocols::{
    AtmCell, EthernetHeader, IcmpHeader, Ieee80211Header, Ipv4Header, Ipv6ExtHeader, Ipv6Header,
    LlcSnapHeader, MacAddr, NetworkHeader, PflogHeader, PosHeader, SllHeader, TcpHeader,
    UdpHeader, VlanHeader,
};

/// Payload of the link layer, with sub-headers removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer3<'a> {
    /// EtherType of `bytes`.
    pub ether_type: u16,
    pub bytes: &'a [u8],
    /// Outermost 802.1Q/802.1ad tag, when there was one.
    pub vlan_id: Option<u16>,
}

/// Payload of the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transport<'a> {
    /// IP protocol number of `bytes`.
    pub protocol: u8,
    pub bytes: &'a [u8],
}

/// Which side of a conversation is probably the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPort {
    Source,
    Destination,
}

/// The packet's link type and captured link-layer bytes.
pub fn link(packet: &Packet) -> Option<(LinkType, &[u8])> {
    Some((packet.link_type()?, packet.link()))
}

/// The link header of an Ethernet packet.
pub fn ethernet(packet: &Packet) -> Option<EthernetHeader<'_>> {
    match link(packet)? {
        (LinkType::Ethernet, bytes) => EthernetHeader::new(bytes),
        _ => None,
    }
}

/// 802.11 header of a wireless packet, past any Prism monitor header.
fn wireless(link_type: LinkType, bytes: &[u8]) -> Option<Ieee80211Header<'_>> {
    match link_type {
        LinkType::Ieee80211 => Ieee80211Header::new(bytes),
        LinkType::Ieee80211Prism => Ieee80211Header::new(bytes.get(layout::PRISM_HEADER_LEN..)?),
        _ => None,
    }
}

pub fn source_mac(packet: &Packet) -> Option<MacAddr> {
    let (link_type, bytes) = link(packet)?;
    match link_type {
        LinkType::Ethernet => EthernetHeader::new(bytes).map(|eth| eth.source()),
        _ => wireless(link_type, bytes).map(|wifi| wifi.addr2()),
    }
}

pub fn destination_mac(packet: &Packet) -> Option<MacAddr> {
    let (link_type, bytes) = link(packet)?;
    match link_type {
        LinkType::Ethernet => EthernetHeader::new(bytes).map(|eth| eth.destination()),
        _ => wireless(link_type, bytes).map(|wifi| wifi.addr1()),
    }
}

/// Strip VLAN tags and LLC/SNAP headers until a real EtherType appears.
fn strip_subheaders(mut layer: Layer3<'_>) -> Option<Layer3<'_>> {
    loop {
        match layer.ether_type {
            layout::ETHERTYPE_VLAN | layout::ETHERTYPE_QINQ | layout::ETHERTYPE_QINQ_LEGACY => {
                let tag = VlanHeader::new(layer.bytes)?;
                layer.vlan_id = layer.vlan_id.or(Some(tag.vlan_id()));
                layer.ether_type = tag.ether_type();
                layer.bytes = tag.payload();
            }
            // an 802.3 length field: LLC follows
            len if len <= layout::ETHERNET_MAX_LENGTH_FIELD => {
                let llc = LlcSnapHeader::new(layer.bytes)?;
                if !llc.is_snap() {
                    return None;
                }
                layer.ether_type = llc.ether_type();
                layer.bytes = llc.payload();
            }
            _ => return Some(layer),
        }
    }
}

/// Resolve the network-layer payload of raw link-layer bytes.
///
/// # Examples
/// ```
/// use tracekit_core::LinkType;
/// use tracekit_core::decode::layer3_from_link;
///
/// // raw IP: the version nibble decides
/// let layer = layer3_from_link(LinkType::None, &[0x45, 0, 0, 20]).unwrap();
/// assert_eq!(layer.ether_type, 0x0800);
/// assert!(layer3_from_link(LinkType::Ethernet, &[0u8; 10]).is_none());
/// ```
pub fn layer3_from_link(link_type: LinkType, bytes: &[u8]) -> Option<Layer3<'_>> {
    let tagged = |ether_type: u16, bytes| Layer3 {
        ether_type,
        bytes,
        vlan_id: None,
    };
    let llc = |bytes| {
        let llc = LlcSnapHeader::new(bytes)?;
        llc.is_snap().then(|| tagged(llc.ether_type(), llc.payload()))
    };

    let layer = match link_type {
        LinkType::Ethernet => {
            let eth = EthernetHeader::new(bytes)?;
            tagged(eth.ether_type(), eth.payload())
        }
        LinkType::None => match bytes.first()? >> 4 {
            4 => tagged(layout::ETHERTYPE_IPV4, bytes),
            6 => tagged(layout::ETHERTYPE_IPV6, bytes),
            _ => return None,
        },
        LinkType::Atm => llc(AtmCell::new(bytes)?.payload())?,
        LinkType::Aal5 => llc(bytes)?,
        LinkType::Pos | LinkType::HdlcPos => {
            let pos = PosHeader::new(bytes)?;
            tagged(pos.ether_type(), pos.payload())
        }
        LinkType::Ieee80211 | LinkType::Ieee80211Prism => {
            let wifi = wireless(link_type, bytes)?;
            if !wifi.is_data() {
                return None;
            }
            llc(wifi.payload())?
        }
        LinkType::LinuxSll => {
            let sll = SllHeader::new(bytes)?;
            tagged(sll.protocol(), sll.payload())
        }
        LinkType::Pflog => {
            let pflog = PflogHeader::new(bytes)?;
            tagged(pflog.ether_type()?, pflog.payload())
        }
    };
    strip_subheaders(layer)
}

/// The network-layer payload of a packet, or `None` for unknown link types
/// and truncated link headers.
pub fn layer3(packet: &Packet) -> Option<Layer3<'_>> {
    let (link_type, bytes) = link(packet)?;
    layer3_from_link(link_type, bytes)
}

pub fn ip(packet: &Packet) -> Option<Ipv4Header<'_>> {
    let layer = layer3(packet)?;
    (layer.ether_type == layout::ETHERTYPE_IPV4)
        .then(|| Ipv4Header::new(layer.bytes))
        .flatten()
}

pub fn ip6(packet: &Packet) -> Option<Ipv6Header<'_>> {
    let layer = layer3(packet)?;
    (layer.ether_type == layout::ETHERTYPE_IPV6)
        .then(|| Ipv6Header::new(layer.bytes))
        .flatten()
}

pub fn network(packet: &Packet) -> Option<NetworkHeader<'_>> {
    let layer = layer3(packet)?;
    match layer.ether_type {
        layout::ETHERTYPE_IPV4 => Ipv4Header::new(layer.bytes).map(NetworkHeader::V4),
        layout::ETHERTYPE_IPV6 => Ipv6Header::new(layer.bytes).map(NetworkHeader::V6),
        _ => None,
    }
}

/// Bytes available from the start of `bytes` under `remaining`.
fn budget(bytes: &[u8], remaining: u32) -> usize {
    (remaining as usize).min(bytes.len())
}

/// Skip a header of `header_len` bytes, shrinking the budget.
fn skip_header<'a>(bytes: &'a [u8], header_len: usize, remaining: &mut u32) -> Option<&'a [u8]> {
    let available = budget(bytes, *remaining);
    if header_len > available {
        *remaining = 0;
        return None;
    }
    *remaining = (available - header_len) as u32;
    if available == header_len {
        return None;
    }
    Some(&bytes[header_len..available])
}

/// Everything after the IPv4 header, using the declared IHL.
///
/// # Examples
/// ```
/// use tracekit_core::decode::payload_from_ip;
/// use tracekit_core::protocols::Ipv4Header;
///
/// let mut bytes = [0u8; 28];
/// bytes[0] = 0x40; // IHL 0
/// let ip = Ipv4Header::new(&bytes).unwrap();
/// let mut remaining = 28;
/// assert!(payload_from_ip(&ip, &mut remaining).is_none());
/// assert_eq!(remaining, 0);
/// ```
pub fn payload_from_ip<'a>(ip: &Ipv4Header<'a>, remaining: &mut u32) -> Option<&'a [u8]> {
    if ip.ihl() < layout::IPV4_MIN_IHL {
        *remaining = 0;
        return None;
    }
    skip_header(ip.as_bytes(), ip.header_len(), remaining)
}

fn is_ipv6_extension(next_header: u8) -> bool {
    matches!(
        next_header,
        layout::IPPROTO_HOPOPTS
            | layout::IPPROTO_ROUTING
            | layout::IPPROTO_FRAGMENT
            | layout::IPPROTO_DSTOPTS
            | layout::IPPROTO_AH
            | layout::IPPROTO_MOBILITY
    )
}

/// Walk the extension chain. The flag is false inside a non-first fragment.
fn walk_ipv6<'a>(ip6: &Ipv6Header<'a>, remaining: &mut u32) -> Option<(Transport<'a>, bool)> {
    let mut bytes = skip_header(ip6.as_bytes(), Ipv6Header::LEN, remaining)?;
    let mut next_header = ip6.next_header();
    let mut first_fragment = true;
    while is_ipv6_extension(next_header) {
        let Some(ext) = Ipv6ExtHeader::new(next_header, &bytes[..budget(bytes, *remaining)]) else {
            *remaining = 0;
            return None;
        };
        if ext.fragment_offset().is_some_and(|offset| offset != 0) {
            first_fragment = false;
        }
        next_header = ext.next_header();
        bytes = skip_header(bytes, ext.header_len(), remaining)?;
    }
    Some((
        Transport {
            protocol: next_header,
            bytes,
        },
        first_fragment,
    ))
}

/// Everything after the IPv6 header and its extension headers, with the
/// protocol of what follows.
pub fn payload_from_ip6<'a>(ip6: &Ipv6Header<'a>, remaining: &mut u32) -> Option<Transport<'a>> {
    walk_ipv6(ip6, remaining).map(|(transport, _)| transport)
}

/// The transport header under a network header. Non-first fragments have
/// none.
pub fn transport_from_network<'a>(
    network: NetworkHeader<'a>,
    remaining: &mut u32,
) -> Option<Transport<'a>> {
    match network {
        NetworkHeader::V4(ip) => {
            let bytes = payload_from_ip(&ip, remaining)?;
            (ip.fragment_offset() == 0).then_some(Transport {
                protocol: ip.protocol(),
                bytes,
            })
        }
        NetworkHeader::V6(ip6) => match walk_ipv6(&ip6, remaining)? {
            (transport, true) => Some(transport),
            (_, false) => None,
        },
    }
}

pub fn transport(packet: &Packet) -> Option<Transport<'_>> {
    let network = network(packet)?;
    let mut remaining = u32::try_from(network.as_bytes().len()).unwrap_or(u32::MAX);
    transport_from_network(network, &mut remaining)
}

fn transport_of<'a>(
    network: NetworkHeader<'a>,
    remaining: &mut u32,
    protocol: u8,
) -> Option<&'a [u8]> {
    let transport = transport_from_network(network, remaining)?;
    (transport.protocol == protocol).then_some(transport.bytes)
}

pub fn tcp(packet: &Packet) -> Option<TcpHeader<'_>> {
    let transport = transport(packet)?;
    (transport.protocol == layout::IPPROTO_TCP)
        .then(|| TcpHeader::new(transport.bytes))
        .flatten()
}

pub fn tcp_from_ip<'a>(
    network: impl Into<NetworkHeader<'a>>,
    remaining: &mut u32,
) -> Option<TcpHeader<'a>> {
    TcpHeader::new(transport_of(network.into(), remaining, layout::IPPROTO_TCP)?)
}

pub fn udp(packet: &Packet) -> Option<UdpHeader<'_>> {
    let transport = transport(packet)?;
    (transport.protocol == layout::IPPROTO_UDP)
        .then(|| UdpHeader::new(transport.bytes))
        .flatten()
}

pub fn udp_from_ip<'a>(
    network: impl Into<NetworkHeader<'a>>,
    remaining: &mut u32,
) -> Option<UdpHeader<'a>> {
    UdpHeader::new(transport_of(network.into(), remaining, layout::IPPROTO_UDP)?)
}

pub fn icmp(packet: &Packet) -> Option<IcmpHeader<'_>> {
    let transport = transport(packet)?;
    (transport.protocol == layout::IPPROTO_ICMP)
        .then(|| IcmpHeader::new(transport.bytes))
        .flatten()
}

pub fn icmp_from_ip<'a>(
    network: impl Into<NetworkHeader<'a>>,
    remaining: &mut u32,
) -> Option<IcmpHeader<'a>> {
    IcmpHeader::new(transport_of(network.into(), remaining, layout::IPPROTO_ICMP)?)
}

/// Segment data after the TCP header, sized by the data offset.
pub fn payload_from_tcp<'a>(tcp: &TcpHeader<'a>, remaining: &mut u32) -> Option<&'a [u8]> {
    if tcp.data_offset() < layout::TCP_MIN_DOFF {
        *remaining = 0;
        return None;
    }
    skip_header(tcp.as_bytes(), tcp.header_len(), remaining)
}

pub fn payload_from_udp<'a>(udp: &UdpHeader<'a>, remaining: &mut u32) -> Option<&'a [u8]> {
    skip_header(udp.as_bytes(), UdpHeader::LEN, remaining)
}

pub fn payload_from_icmp<'a>(icmp: &IcmpHeader<'a>, remaining: &mut u32) -> Option<&'a [u8]> {
    skip_header(icmp.as_bytes(), IcmpHeader::LEN, remaining)
}

pub fn source_address(packet: &Packet) -> Option<IpAddr> {
    network(packet).map(|network| network.source())
}

pub fn destination_address(packet: &Packet) -> Option<IpAddr> {
    network(packet).map(|network| network.destination())
}

/// TCP or UDP ports; only the first four bytes need to be captured.
fn ports(packet: &Packet) -> Option<(u16, u16)> {
    let transport = transport(packet)?;
    if !matches!(transport.protocol, layout::IPPROTO_TCP | layout::IPPROTO_UDP) {
        return None;
    }
    let reader = FieldReader::with_len(transport.bytes, 4)?;
    Some((reader.u16_be(0..2), reader.u16_be(2..4)))
}

pub fn source_port(packet: &Packet) -> Option<u16> {
    ports(packet).map(|(source, _)| source)
}

pub fn destination_port(packet: &Packet) -> Option<u16> {
    ports(packet).map(|(_, destination)| destination)
}

fn root_server(port: u16) -> bool {
    port < 512
}

fn root_client(port: u16) -> bool {
    (512..1024).contains(&port)
}

fn nonroot_server(port: u16) -> bool {
    port >= 5000
}

fn nonroot_client(port: u16) -> bool {
    (1024..5000).contains(&port)
}

fn dynamic(port: u16) -> bool {
    port >= 49152
}

/// Guess which port belongs to the server.
///
/// Privileged ports win over unprivileged ones, registered ports over the
/// dynamic range, and otherwise the lower port. Equal ports favour the
/// destination.
///
/// # Examples
/// ```
/// use tracekit_core::decode::{ServerPort, server_port};
///
/// assert_eq!(server_port(51_000, 80), ServerPort::Destination);
/// assert_eq!(server_port(8080, 60_000), ServerPort::Source);
/// ```
pub fn server_port(source: u16, destination: u16) -> ServerPort {
    use ServerPort::{Destination, Source};

    let server = |port| root_server(port) || nonroot_server(port);
    if source == destination {
        return Destination;
    }
    if server(source) && root_client(destination) {
        return Source;
    }
    if server(destination) && root_client(source) {
        return Destination;
    }
    if root_server(source) != root_server(destination) {
        return if root_server(source) { Source } else { Destination };
    }
    if nonroot_server(source) && nonroot_client(destination) {
        return Source;
    }
    if nonroot_server(destination) && nonroot_client(source) {
        return Destination;
    }
    if dynamic(source) != dynamic(destination) {
        return if dynamic(source) { Destination } else { Source };
    }
    if source < destination { Source } else { Destination }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use etherparse::PacketBuilder;
    use pcap_parser::Linktype;

    use super::*;
    use crate::format::{PacketFormat, pcap};
    use crate::timestamp::Timestamp;

    fn packet(dlt: i32, frame: &[u8]) -> Packet {
        let len = frame.len() as u32;
        let header = pcap::layout::record_header(Timestamp::default(), len, len);
        let mut packet = Packet::new();
        packet.load_owned(PacketFormat::Pcap(Linktype(dlt)), &header, frame);
        packet
    }

    fn tcp_frame(payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(40_000, 80, 1, 1024);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        frame
    }

    #[test]
    fn walks_ethernet_ipv4_tcp() {
        let packet = packet(1, &tcp_frame(b"hello"));
        assert_eq!(source_mac(&packet), Some(MacAddr::new([1, 2, 3, 4, 5, 6])));
        assert_eq!(
            source_address(&packet),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        let tcp = tcp(&packet).unwrap();
        assert_eq!(tcp.destination_port(), 80);
        let mut remaining = tcp.as_bytes().len() as u32;
        assert_eq!(payload_from_tcp(&tcp, &mut remaining), Some(&b"hello"[..]));
        assert_eq!(remaining, 5);
        assert_eq!(source_port(&packet), Some(40_000));
        assert!(udp(&packet).is_none());
    }

    #[test]
    fn strips_vlan_tags() {
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .single_vlan(etherparse::VlanId::try_new(0x123).unwrap())
            .ipv4([192, 168, 1, 1], [192, 168, 1, 2], 8)
            .udp(5353, 5353);
        let mut frame = Vec::new();
        builder.write(&mut frame, &[9; 3]).unwrap();
        let packet = packet(1, &frame);

        let layer = layer3(&packet).unwrap();
        assert_eq!(layer.vlan_id, Some(0x123));
        assert_eq!(layer.ether_type, layout::ETHERTYPE_IPV4);
        assert_eq!(udp(&packet).unwrap().source_port(), 5353);
    }

    #[test]
    fn llc_snap_under_aal5() {
        let mut frame = vec![0xaa, 0xaa, 0x03, 0, 0, 0, 0x08, 0x00];
        let builder = PacketBuilder::ipv4([1, 1, 1, 1], [2, 2, 2, 2], 1).udp(1, 2);
        builder.write(&mut frame, &[]).unwrap();
        let packet = packet(11, &frame);
        let layer = layer3(&packet).unwrap();
        assert_eq!(layer.ether_type, layout::ETHERTYPE_IPV4);
        assert!(ip(&packet).is_some());
    }

    #[test]
    fn ipv4_header_length_zero_stops_the_walk() {
        let mut frame = tcp_frame(&[]);
        frame[14] = 0x40;
        let packet = packet(1, &frame);
        let ip = ip(&packet).unwrap();
        let mut remaining = 40;
        assert!(payload_from_ip(&ip, &mut remaining).is_none());
        assert_eq!(remaining, 0);
        assert!(tcp(&packet).is_none());
    }

    #[test]
    fn header_longer_than_budget() {
        let frame = tcp_frame(&[]);
        let packet = packet(1, &frame);
        let ip = ip(&packet).unwrap();
        let mut remaining = 12;
        assert!(payload_from_ip(&ip, &mut remaining).is_none());
        assert_eq!(remaining, 0);
    }

    #[test]
    fn zero_payload_after_link_header() {
        let frame = &tcp_frame(&[])[..14];
        let packet = packet(1, frame);
        assert!(ethernet(&packet).is_some());
        assert!(network(&packet).is_none());
        assert!(transport(&packet).is_none());
        assert!(source_port(&packet).is_none());
    }

    #[test]
    fn non_first_fragments_have_no_transport() {
        let mut frame = tcp_frame(b"abc");
        // fragment offset 1 (8 bytes)
        frame[14 + 6] = 0x00;
        frame[14 + 7] = 0x01;
        let packet = packet(1, &frame);
        assert!(ip(&packet).is_some());
        assert!(transport(&packet).is_none());
    }

    #[test]
    fn ipv6_extension_chain() {
        let builder = PacketBuilder::ipv6([0xfe; 16], [0xfd; 16], 4).udp(53, 5000);
        let mut frame = Vec::new();
        builder.write(&mut frame, &[1, 2]).unwrap();
        // splice in a hop-by-hop header carrying the UDP protocol number
        let udp = frame.split_off(40);
        frame[6] = layout::IPPROTO_HOPOPTS;
        frame.extend_from_slice(&[layout::IPPROTO_UDP, 0, 0, 0, 0, 0, 0, 0]);
        frame.extend_from_slice(&udp);

        let packet = packet(101, &frame);
        let ip6 = ip6(&packet).unwrap();
        let mut remaining = frame.len() as u32;
        let transport = payload_from_ip6(&ip6, &mut remaining).unwrap();
        assert_eq!(transport.protocol, layout::IPPROTO_UDP);
        assert_eq!(remaining as usize, udp.len());
        assert_eq!(udp_from_ip(ip6, &mut (frame.len() as u32)).unwrap().source_port(), 53);
        assert_eq!(destination_port(&packet), Some(5000));
    }

    #[test]
    fn icmp_echo() {
        let builder = PacketBuilder::ipv4([1, 1, 1, 1], [2, 2, 2, 2], 1).icmpv4_echo_request(7, 9);
        let mut frame = Vec::new();
        builder.write(&mut frame, &[0; 4]).unwrap();
        let packet = packet(101, &frame);
        let icmp = icmp(&packet).unwrap();
        assert_eq!(icmp.icmp_type(), IcmpHeader::ECHO_REQUEST);
        assert_eq!(icmp.echo_sequence(), 9);
        let mut remaining = 12;
        assert_eq!(payload_from_icmp(&icmp, &mut remaining), Some(&[0u8; 4][..]));
    }

    #[test]
    fn unknown_link_type_has_no_layers() {
        let packet = packet(147, &tcp_frame(&[]));
        assert!(link(&packet).is_none());
        assert!(layer3(&packet).is_none());
    }

    #[test]
    fn wireless_data_frame() {
        let mut frame = vec![0u8; 24];
        frame[0] = 0x08; // data
        frame[4..10].copy_from_slice(&[0xaa; 6]);
        frame[10..16].copy_from_slice(&[0xbb; 6]);
        frame.extend_from_slice(&[0xaa, 0xaa, 0x03, 0, 0, 0, 0x86, 0xdd]);
        let packet = packet(105, &frame);
        assert_eq!(destination_mac(&packet), Some(MacAddr::new([0xaa; 6])));
        assert_eq!(source_mac(&packet), Some(MacAddr::new([0xbb; 6])));
        assert_eq!(layer3(&packet).unwrap().ether_type, layout::ETHERTYPE_IPV6);
    }

    #[test]
    fn server_port_heuristic() {
        assert_eq!(server_port(443, 443), ServerPort::Destination);
        assert_eq!(server_port(22, 1023), ServerPort::Source);
        assert_eq!(server_port(3000, 7000), ServerPort::Destination);
        assert_eq!(server_port(50_000, 20_000), ServerPort::Destination);
        assert_eq!(server_port(6000, 7000), ServerPort::Source);
    }
}
