//! Transport-layer header views.

use std::net::Ipv4Addr;

use super::common::FieldReader;
use super::layout;

/// TCP header. The data offset is reported as declared; the payload
/// functions validate it.
#[derive(Debug, Clone, Copy)]
pub struct TcpHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> TcpHeader<'a> {
    pub const MIN_LEN: usize = layout::TCP_HEADER_LEN;

    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::MIN_LEN).map(|reader| Self { reader })
    }

    pub fn source_port(&self) -> u16 {
        self.reader.u16_be(layout::TCP_SRC_PORT_RANGE)
    }

    pub fn destination_port(&self) -> u16 {
        self.reader.u16_be(layout::TCP_DST_PORT_RANGE)
    }

    pub fn sequence(&self) -> u32 {
        self.reader.u32_be(layout::TCP_SEQ_RANGE)
    }

    pub fn acknowledgement(&self) -> u32 {
        self.reader.u32_be(layout::TCP_ACK_RANGE)
    }

    /// Header length in 32-bit words, as declared.
    pub fn data_offset(&self) -> u8 {
        self.reader.u8_at(layout::TCP_DOFF_OFFSET) >> 4
    }

    pub fn header_len(&self) -> usize {
        usize::from(self.data_offset()) * 4
    }

    pub fn flags(&self) -> u8 {
        self.reader.u8_at(layout::TCP_FLAGS_OFFSET)
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags() & flag == flag
    }

    pub fn window(&self) -> u16 {
        self.reader.u16_be(layout::TCP_WINDOW_RANGE)
    }

    pub fn checksum(&self) -> u16 {
        self.reader.u16_be(layout::TCP_CHECKSUM_RANGE)
    }

    pub fn urgent_pointer(&self) -> u16 {
        self.reader.u16_be(layout::TCP_URGENT_RANGE)
    }

    /// Option bytes, or `None` when the declared header is not captured.
    pub fn options(&self) -> Option<&'a [u8]> {
        if self.data_offset() < layout::TCP_MIN_DOFF {
            return None;
        }
        self.reader.slice(Self::MIN_LEN..self.header_len())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.reader.bytes()
    }
}

/// UDP header.
#[derive(Debug, Clone, Copy)]
pub struct UdpHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> UdpHeader<'a> {
    pub const LEN: usize = layout::UDP_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn source_port(&self) -> u16 {
        self.reader.u16_be(layout::UDP_SRC_PORT_RANGE)
    }

    pub fn destination_port(&self) -> u16 {
        self.reader.u16_be(layout::UDP_DST_PORT_RANGE)
    }

    pub fn length(&self) -> u16 {
        self.reader.u16_be(layout::UDP_LENGTH_RANGE)
    }

    pub fn checksum(&self) -> u16 {
        self.reader.u16_be(layout::UDP_CHECKSUM_RANGE)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.reader.bytes()
    }
}

/// ICMP header. The second word is interpreted according to the message
/// type by the caller.
#[derive(Debug, Clone, Copy)]
pub struct IcmpHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> IcmpHeader<'a> {
    pub const LEN: usize = layout::ICMP_HEADER_LEN;

    pub const ECHO_REPLY: u8 = 0;
    pub const DEST_UNREACHABLE: u8 = 3;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn icmp_type(&self) -> u8 {
        self.reader.u8_at(layout::ICMP_TYPE_OFFSET)
    }

    pub fn code(&self) -> u8 {
        self.reader.u8_at(layout::ICMP_CODE_OFFSET)
    }

    pub fn checksum(&self) -> u16 {
        self.reader.u16_be(layout::ICMP_CHECKSUM_RANGE)
    }

    pub fn echo_id(&self) -> u16 {
        self.reader.u16_be(layout::ICMP_ECHO_ID_RANGE)
    }

    pub fn echo_sequence(&self) -> u16 {
        self.reader.u16_be(layout::ICMP_ECHO_SEQ_RANGE)
    }

    /// Gateway address of a redirect message.
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.reader.array::<4>(layout::ICMP_GATEWAY_RANGE))
    }

    /// Next-hop MTU of a "fragmentation needed" message.
    pub fn next_hop_mtu(&self) -> u16 {
        self.reader.u16_be(layout::ICMP_FRAG_MTU_RANGE)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.reader.bytes()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::{IcmpHeader, TcpHeader, UdpHeader};

    #[test]
    fn tcp_fields_and_options() {
        let mut bytes = [0u8; 24];
        bytes[0..2].copy_from_slice(&443u16.to_be_bytes());
        bytes[2..4].copy_from_slice(&51000u16.to_be_bytes());
        bytes[4..8].copy_from_slice(&7u32.to_be_bytes());
        bytes[12] = 6 << 4;
        bytes[13] = TcpHeader::SYN | TcpHeader::ACK;
        bytes[14..16].copy_from_slice(&1024u16.to_be_bytes());
        bytes[20..24].copy_from_slice(&[2, 4, 0x05, 0xb4]);
        let tcp = TcpHeader::new(&bytes).unwrap();
        assert_eq!(tcp.source_port(), 443);
        assert_eq!(tcp.destination_port(), 51000);
        assert_eq!(tcp.sequence(), 7);
        assert_eq!(tcp.header_len(), 24);
        assert!(tcp.has_flag(TcpHeader::SYN | TcpHeader::ACK));
        assert!(!tcp.has_flag(TcpHeader::FIN));
        assert_eq!(tcp.window(), 1024);
        assert_eq!(tcp.options(), Some(&[2u8, 4, 0x05, 0xb4][..]));
    }

    #[test]
    fn tcp_options_need_captured_header() {
        let mut bytes = [0u8; 20];
        bytes[12] = 8 << 4;
        let tcp = TcpHeader::new(&bytes).unwrap();
        assert!(tcp.options().is_none());
        assert!(TcpHeader::new(&bytes[..19]).is_none());
    }

    #[test]
    fn udp_fields() {
        let bytes = [0x00, 0x35, 0xc0, 0x00, 0x00, 0x08, 0xbe, 0xef];
        let udp = UdpHeader::new(&bytes).unwrap();
        assert_eq!(udp.source_port(), 53);
        assert_eq!(udp.destination_port(), 0xc000);
        assert_eq!(udp.length(), 8);
        assert_eq!(udp.checksum(), 0xbeef);
    }

    #[test]
    fn icmp_second_word_views() {
        let bytes = [8, 0, 0x12, 0x34, 192, 168, 1, 254];
        let icmp = IcmpHeader::new(&bytes).unwrap();
        assert_eq!(icmp.icmp_type(), IcmpHeader::ECHO_REQUEST);
        assert_eq!(icmp.echo_id(), 0xc0a8);
        assert_eq!(icmp.echo_sequence(), 0x01fe);
        assert_eq!(icmp.gateway(), Ipv4Addr::new(192, 168, 1, 254));
        assert_eq!(icmp.next_hop_mtu(), 0x01fe);
    }
}
