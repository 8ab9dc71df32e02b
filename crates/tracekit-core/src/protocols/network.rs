//! Network-layer header views.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::common::FieldReader;
use super::layout;

/// IPv4 header.
///
/// Construction only proves the fixed 20 bytes are present. The IHL field is
/// not trusted: [`Ipv4Header::header_len`] reports the declared length and
/// the payload functions in [`crate::decode`] validate it against the budget.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header<'a> {
    reader: FieldReader<'a>,
}

impl<'a> Ipv4Header<'a> {
    pub const MIN_LEN: usize = layout::IPV4_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::MIN_LEN).map(|reader| Self { reader })
    }

    pub fn version(&self) -> u8 {
        self.reader.u8_at(layout::IPV4_VERSION_IHL_OFFSET) >> 4
    }

    /// Header length in 32-bit words, as declared.
    pub fn ihl(&self) -> u8 {
        self.reader.u8_at(layout::IPV4_VERSION_IHL_OFFSET) & 0x0f
    }

    /// Declared header length in bytes.
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl()) * 4
    }

    pub fn tos(&self) -> u8 {
        self.reader.u8_at(layout::IPV4_TOS_OFFSET)
    }

    pub fn total_length(&self) -> u16 {
        self.reader.u16_be(layout::IPV4_TOTAL_LEN_RANGE)
    }

    pub fn identification(&self) -> u16 {
        self.reader.u16_be(layout::IPV4_ID_RANGE)
    }

    fn fragment_word(&self) -> u16 {
        self.reader.u16_be(layout::IPV4_FRAG_RANGE)
    }

    pub fn dont_fragment(&self) -> bool {
        self.fragment_word() & layout::IPV4_FLAG_DF != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.fragment_word() & layout::IPV4_FLAG_MF != 0
    }

    /// Fragment offset in 8-byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.fragment_word() & layout::IPV4_FRAG_OFFSET_MASK
    }

    pub fn ttl(&self) -> u8 {
        self.reader.u8_at(layout::IPV4_TTL_OFFSET)
    }

    pub fn protocol(&self) -> u8 {
        self.reader.u8_at(layout::IPV4_PROTOCOL_OFFSET)
    }

    pub fn checksum(&self) -> u16 {
        self.reader.u16_be(layout::IPV4_CHECKSUM_RANGE)
    }

    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.reader.array::<4>(layout::IPV4_SRC_RANGE))
    }

    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.reader.array::<4>(layout::IPV4_DST_RANGE))
    }

    /// Option bytes, or `None` when the declared header is not captured.
    pub fn options(&self) -> Option<&'a [u8]> {
        if self.ihl() < layout::IPV4_MIN_IHL {
            return None;
        }
        self.reader.slice(Self::MIN_LEN..self.header_len())
    }

    /// Everything from the start of the header to the end of the capture.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.reader.bytes()
    }
}

/// IPv6 fixed header.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Header<'a> {
    reader: FieldReader<'a>,
}

impl<'a> Ipv6Header<'a> {
    pub const LEN: usize = layout::IPV6_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    fn first_word(&self) -> u32 {
        self.reader.u32_be(layout::IPV6_VTF_RANGE)
    }

    pub fn version(&self) -> u8 {
        (self.first_word() >> 28) as u8
    }

    pub fn traffic_class(&self) -> u8 {
        (self.first_word() >> 20) as u8
    }

    pub fn flow_label(&self) -> u32 {
        self.first_word() & 0x000f_ffff
    }

    pub fn payload_length(&self) -> u16 {
        self.reader.u16_be(layout::IPV6_PAYLOAD_LEN_RANGE)
    }

    pub fn next_header(&self) -> u8 {
        self.reader.u8_at(layout::IPV6_NEXT_HEADER_OFFSET)
    }

    pub fn hop_limit(&self) -> u8 {
        self.reader.u8_at(layout::IPV6_HOP_LIMIT_OFFSET)
    }

    pub fn source(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.reader.array::<16>(layout::IPV6_SRC_RANGE))
    }

    pub fn destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.reader.array::<16>(layout::IPV6_DST_RANGE))
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.reader.bytes()
    }
}

/// Generic IPv6 extension header (next header + length).
#[derive(Debug, Clone, Copy)]
pub struct Ipv6ExtHeader<'a> {
    kind: u8,
    reader: FieldReader<'a>,
}

impl<'a> Ipv6ExtHeader<'a> {
    /// View an extension header of protocol number `kind`.
    ///
    /// Fails when the header's declared length is not captured.
    pub fn new(kind: u8, bytes: &'a [u8]) -> Option<Self> {
        let header = Self {
            kind,
            reader: FieldReader::with_len(bytes, layout::IPV6_EXT_MIN_LEN)?,
        };
        if bytes.len() < header.header_len() {
            return None;
        }
        Some(header)
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn next_header(&self) -> u8 {
        self.reader.u8_at(0)
    }

    /// Length in bytes, including the first eight.
    pub fn header_len(&self) -> usize {
        let len = usize::from(self.reader.u8_at(1));
        match self.kind {
            layout::IPPROTO_FRAGMENT => layout::IPV6_EXT_MIN_LEN,
            layout::IPPROTO_AH => (len + 2) * 4,
            _ => (len + 1) * 8,
        }
    }

    /// Fragment offset in 8-byte units, for fragment headers only.
    pub fn fragment_offset(&self) -> Option<u16> {
        if self.kind != layout::IPPROTO_FRAGMENT {
            return None;
        }
        Some((self.reader.u16_be(layout::IPV6_FRAG_OFFSET_RANGE) & layout::IPV6_FRAG_OFFSET_MASK) >> 3)
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(self.header_len())
    }
}

/// Either network header, as produced by the decode chain.
#[derive(Debug, Clone, Copy)]
pub enum NetworkHeader<'a> {
    V4(Ipv4Header<'a>),
    V6(Ipv6Header<'a>),
}

impl<'a> NetworkHeader<'a> {
    pub fn source(&self) -> IpAddr {
        match self {
            NetworkHeader::V4(ip) => IpAddr::V4(ip.source()),
            NetworkHeader::V6(ip) => IpAddr::V6(ip.source()),
        }
    }

    pub fn destination(&self) -> IpAddr {
        match self {
            NetworkHeader::V4(ip) => IpAddr::V4(ip.destination()),
            NetworkHeader::V6(ip) => IpAddr::V6(ip.destination()),
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            NetworkHeader::V4(ip) => ip.as_bytes(),
            NetworkHeader::V6(ip) => ip.as_bytes(),
        }
    }
}

impl<'a> From<Ipv4Header<'a>> for NetworkHeader<'a> {
    fn from(ip: Ipv4Header<'a>) -> Self {
        NetworkHeader::V4(ip)
    }
}

impl<'a> From<Ipv6Header<'a>> for NetworkHeader<'a> {
    fn from(ip: Ipv6Header<'a>) -> Self {
        NetworkHeader::V6(ip)
    }
}
