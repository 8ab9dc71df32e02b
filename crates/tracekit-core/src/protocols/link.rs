//! Link-layer header views.

use std::fmt;
use std::str::FromStr;

use super::common::FieldReader;
use super::layout;
use crate::error::TraceError;

/// A 48-bit hardware address.
///
/// Text form is six colon-separated hex pairs.
///
/// # Examples
/// ```
/// use tracekit_core::MacAddr;
///
/// let mac: MacAddr = "00:1b:21:0a:ff:02".parse().unwrap();
/// assert_eq!(mac.octets(), [0x00, 0x1b, 0x21, 0x0a, 0xff, 0x02]);
/// assert_eq!(mac.to_string(), "00:1b:21:0a:ff:02");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr([u8; layout::MAC_LEN]);

impl MacAddr {
    pub const fn new(octets: [u8; layout::MAC_LEN]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; layout::MAC_LEN] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; layout::MAC_LEN]
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; layout::MAC_LEN]> for MacAddr {
    fn from(octets: [u8; layout::MAC_LEN]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = TraceError;

    /// Parse `aa:bb:cc:dd:ee:ff`; single-digit groups such as `0:1b:...` are
    /// accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TraceError::BadFormat(format!("invalid MAC address '{s}'"));
        let mut octets = [0u8; layout::MAC_LEN];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(bad)?;
            if part.is_empty() || part.len() > 2 {
                return Err(bad());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| bad())?;
        }
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self(octets))
    }
}

/// Ethernet II header.
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> EthernetHeader<'a> {
    pub const LEN: usize = layout::ETHERNET_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn destination(&self) -> MacAddr {
        MacAddr(self.reader.array(layout::ETHERNET_DST_RANGE))
    }

    pub fn source(&self) -> MacAddr {
        MacAddr(self.reader.array(layout::ETHERNET_SRC_RANGE))
    }

    pub fn ether_type(&self) -> u16 {
        self.reader.u16_be(layout::ETHERNET_TYPE_RANGE)
    }

    /// Bytes following the header.
    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// 802.1Q tag (also used for 802.1ad service tags).
#[derive(Debug, Clone, Copy)]
pub struct VlanHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> VlanHeader<'a> {
    pub const LEN: usize = layout::VLAN_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    fn tci(&self) -> u16 {
        self.reader.u16_be(layout::VLAN_TCI_RANGE)
    }

    pub fn priority(&self) -> u8 {
        (self.tci() >> layout::VLAN_PRIORITY_SHIFT) as u8
    }

    pub fn cfi(&self) -> bool {
        self.tci() & layout::VLAN_CFI_MASK != 0
    }

    pub fn vlan_id(&self) -> u16 {
        self.tci() & layout::VLAN_ID_MASK
    }

    pub fn ether_type(&self) -> u16 {
        self.reader.u16_be(layout::VLAN_TYPE_RANGE)
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// 802.2 LLC header followed by a SNAP extension.
#[derive(Debug, Clone, Copy)]
pub struct LlcSnapHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> LlcSnapHeader<'a> {
    pub const LEN: usize = layout::LLCSNAP_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn dsap(&self) -> u8 {
        self.reader.u8_at(layout::LLCSNAP_DSAP_OFFSET)
    }

    pub fn ssap(&self) -> u8 {
        self.reader.u8_at(layout::LLCSNAP_SSAP_OFFSET)
    }

    pub fn control(&self) -> u8 {
        self.reader.u8_at(layout::LLCSNAP_CONTROL_OFFSET)
    }

    /// 24-bit organisation code.
    pub fn oui(&self) -> u32 {
        let [a, b, c] = self.reader.array::<3>(layout::LLCSNAP_OUI_RANGE);
        u32::from_be_bytes([0, a, b, c])
    }

    pub fn ether_type(&self) -> u16 {
        self.reader.u16_be(layout::LLCSNAP_TYPE_RANGE)
    }

    /// True when both SAPs announce a SNAP extension.
    pub fn is_snap(&self) -> bool {
        self.dsap() == layout::LLC_SNAP_SAP && self.ssap() == layout::LLC_SNAP_SAP
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// ATM cell header as stored by capture hardware (HEC stripped).
#[derive(Debug, Clone, Copy)]
pub struct AtmCell<'a> {
    reader: FieldReader<'a>,
}

impl<'a> AtmCell<'a> {
    pub const LEN: usize = layout::ATM_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    fn word(&self) -> u32 {
        self.reader.u32_be(layout::ATM_WORD_RANGE)
    }

    pub fn gfc(&self) -> u8 {
        (self.word() >> layout::ATM_GFC_SHIFT) as u8
    }

    pub fn vpi(&self) -> u8 {
        ((self.word() >> layout::ATM_VPI_SHIFT) & layout::ATM_VPI_MASK) as u8
    }

    pub fn vci(&self) -> u16 {
        ((self.word() >> layout::ATM_VCI_SHIFT) & layout::ATM_VCI_MASK) as u16
    }

    pub fn payload_type(&self) -> u8 {
        ((self.word() >> layout::ATM_PT_SHIFT) & layout::ATM_PT_MASK) as u8
    }

    pub fn clp(&self) -> bool {
        self.word() & layout::ATM_CLP_MASK != 0
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// Packet-over-SONET (PPP in HDLC-like framing, or Cisco HDLC) header.
#[derive(Debug, Clone, Copy)]
pub struct PosHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> PosHeader<'a> {
    pub const LEN: usize = layout::POS_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn address(&self) -> u8 {
        self.reader.u8_at(layout::POS_ADDRESS_OFFSET)
    }

    pub fn control(&self) -> u8 {
        self.reader.u8_at(layout::POS_CONTROL_OFFSET)
    }

    /// PPP protocol number, or an EtherType for Cisco HDLC framing.
    pub fn protocol(&self) -> u16 {
        self.reader.u16_be(layout::POS_PROTOCOL_RANGE)
    }

    /// The protocol expressed as an EtherType.
    pub fn ether_type(&self) -> u16 {
        match self.protocol() {
            layout::PPP_PROTOCOL_IPV4 => layout::ETHERTYPE_IPV4,
            layout::PPP_PROTOCOL_IPV6 => layout::ETHERTYPE_IPV6,
            other => other,
        }
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// IEEE 802.11 MAC header.
///
/// The fourth address is only present when both DS bits are set; QoS data
/// frames carry two more bytes. [`Ieee80211Header::header_len`] accounts for
/// both and construction fails when the variable part is truncated.
#[derive(Debug, Clone, Copy)]
pub struct Ieee80211Header<'a> {
    reader: FieldReader<'a>,
}

impl<'a> Ieee80211Header<'a> {
    pub const MIN_LEN: usize = layout::WIFI_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        let header = Self {
            reader: FieldReader::with_len(bytes, Self::MIN_LEN)?,
        };
        if bytes.len() < header.header_len() {
            return None;
        }
        Some(header)
    }

    pub fn frame_control(&self) -> u16 {
        self.reader.u16_le(layout::WIFI_FC_RANGE)
    }

    pub fn protocol_version(&self) -> u8 {
        (self.frame_control() & 0x03) as u8
    }

    pub fn frame_type(&self) -> u8 {
        ((self.frame_control() >> 2) & 0x03) as u8
    }

    pub fn subtype(&self) -> u8 {
        ((self.frame_control() >> 4) & 0x0f) as u8
    }

    fn flags(&self) -> u8 {
        (self.frame_control() >> 8) as u8
    }

    pub fn to_ds(&self) -> bool {
        self.flags() & layout::WIFI_FLAG_TO_DS != 0
    }

    pub fn from_ds(&self) -> bool {
        self.flags() & layout::WIFI_FLAG_FROM_DS != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags() & layout::WIFI_FLAG_MORE_FRAGMENTS != 0
    }

    pub fn retry(&self) -> bool {
        self.flags() & layout::WIFI_FLAG_RETRY != 0
    }

    pub fn protected(&self) -> bool {
        self.flags() & layout::WIFI_FLAG_PROTECTED != 0
    }

    pub fn duration(&self) -> u16 {
        self.reader.u16_le(layout::WIFI_DURATION_RANGE)
    }

    pub fn addr1(&self) -> MacAddr {
        MacAddr(self.reader.array(layout::WIFI_ADDR1_RANGE))
    }

    pub fn addr2(&self) -> MacAddr {
        MacAddr(self.reader.array(layout::WIFI_ADDR2_RANGE))
    }

    pub fn addr3(&self) -> MacAddr {
        MacAddr(self.reader.array(layout::WIFI_ADDR3_RANGE))
    }

    pub fn addr4(&self) -> Option<MacAddr> {
        if self.to_ds() && self.from_ds() {
            Some(MacAddr(self.reader.array(layout::WIFI_ADDR4_RANGE)))
        } else {
            None
        }
    }

    pub fn sequence_control(&self) -> u16 {
        self.reader.u16_le(layout::WIFI_SEQ_RANGE)
    }

    pub fn is_data(&self) -> bool {
        self.frame_type() == layout::WIFI_TYPE_DATA
    }

    pub fn header_len(&self) -> usize {
        let mut len = if self.to_ds() && self.from_ds() {
            layout::WIFI_ADDR4_HEADER_LEN
        } else {
            layout::WIFI_HEADER_LEN
        };
        if self.is_data() && self.subtype() & layout::WIFI_SUBTYPE_QOS_BIT != 0 {
            len += layout::WIFI_QOS_LEN;
        }
        len
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(self.header_len())
    }
}

/// Linux "cooked" capture header.
#[derive(Debug, Clone, Copy)]
pub struct SllHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> SllHeader<'a> {
    pub const LEN: usize = layout::SLL_HEADER_LEN;

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        FieldReader::with_len(bytes, Self::LEN).map(|reader| Self { reader })
    }

    pub fn packet_type(&self) -> u16 {
        self.reader.u16_be(layout::SLL_PKTTYPE_RANGE)
    }

    pub fn hardware_type(&self) -> u16 {
        self.reader.u16_be(layout::SLL_HATYPE_RANGE)
    }

    /// Link-layer address, truncated to its declared length.
    pub fn address(&self) -> &'a [u8] {
        let declared = usize::from(self.reader.u16_be(layout::SLL_HALEN_RANGE));
        let full = self.reader.slice(layout::SLL_ADDR_RANGE).unwrap_or(&[]);
        &full[..declared.min(full.len())]
    }

    pub fn protocol(&self) -> u16 {
        self.reader.u16_be(layout::SLL_PROTOCOL_RANGE)
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(Self::LEN)
    }
}

/// OpenBSD pf log header.
///
/// The header declares its own length, padded to a four-byte boundary.
#[derive(Debug, Clone, Copy)]
pub struct PflogHeader<'a> {
    reader: FieldReader<'a>,
}

impl<'a> PflogHeader<'a> {
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        let header = Self {
            reader: FieldReader::with_len(bytes, layout::PFLOG_MIN_LEN)?,
        };
        if header.declared_len() < layout::PFLOG_MIN_LEN || bytes.len() < header.header_len() {
            return None;
        }
        Some(header)
    }

    fn declared_len(&self) -> usize {
        usize::from(self.reader.u8_at(layout::PFLOG_LENGTH_OFFSET))
    }

    pub fn header_len(&self) -> usize {
        self.declared_len().next_multiple_of(layout::PFLOG_ALIGN)
    }

    pub fn address_family(&self) -> u8 {
        self.reader.u8_at(layout::PFLOG_AF_OFFSET)
    }

    pub fn action(&self) -> u8 {
        self.reader.u8_at(layout::PFLOG_ACTION_OFFSET)
    }

    pub fn reason(&self) -> u8 {
        self.reader.u8_at(layout::PFLOG_REASON_OFFSET)
    }

    /// The address family expressed as an EtherType.
    pub fn ether_type(&self) -> Option<u16> {
        let af = self.address_family();
        if af == layout::AF_INET {
            Some(layout::ETHERTYPE_IPV4)
        } else if layout::AF_INET6_VALUES.contains(&af) {
            Some(layout::ETHERTYPE_IPV6)
        } else {
            None
        }
    }

    pub fn payload(&self) -> &'a [u8] {
        self.reader.tail(self.header_len())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AtmCell, EthernetHeader, Ieee80211Header, LlcSnapHeader, MacAddr, PflogHeader, PosHeader,
        SllHeader, VlanHeader,
    };
    use crate::error::ErrorKind;

    #[test]
    fn mac_text_conversion() {
        let mac: MacAddr = "0:1b:21:a:ff:2".parse().unwrap();
        assert_eq!(mac.to_string(), "00:1b:21:0a:ff:02");
        for bad in ["", "00:11:22:33:44", "00:11:22:33:44:55:66", "0g:11:22:33:44:55"] {
            let err = bad.parse::<MacAddr>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadFormat, "{bad}");
        }
    }

    #[test]
    fn ethernet_fields() {
        let mut frame = [0u8; 14];
        frame[..6].copy_from_slice(&[0xff; 6]);
        frame[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        frame[12..14].copy_from_slice(&[0x08, 0x00]);
        let eth = EthernetHeader::new(&frame).unwrap();
        assert!(eth.destination().is_broadcast());
        assert_eq!(eth.source().octets(), [0x02, 0, 0, 0, 0, 1]);
        assert_eq!(eth.ether_type(), 0x0800);
        assert!(eth.payload().is_empty());
        assert!(EthernetHeader::new(&frame[..13]).is_none());
    }

    #[test]
    fn vlan_tci_masks() {
        let tag = [0xb0, 0x64, 0x86, 0xdd];
        let vlan = VlanHeader::new(&tag).unwrap();
        assert_eq!(vlan.priority(), 5);
        assert!(vlan.cfi());
        assert_eq!(vlan.vlan_id(), 100);
        assert_eq!(vlan.ether_type(), 0x86dd);
    }

    #[test]
    fn llcsnap_fields() {
        let bytes = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x0c, 0x08, 0x00];
        let snap = LlcSnapHeader::new(&bytes).unwrap();
        assert!(snap.is_snap());
        assert_eq!(snap.control(), 0x03);
        assert_eq!(snap.oui(), 0x00000c);
        assert_eq!(snap.ether_type(), 0x0800);
    }

    #[test]
    fn atm_cell_bit_fields() {
        // gfc=1 vpi=0x23 vci=0x4567 pt=5 clp=1
        let word: u32 = (1 << 28) | (0x23 << 20) | (0x4567 << 4) | (5 << 1) | 1;
        let bytes = word.to_be_bytes();
        let cell = AtmCell::new(&bytes).unwrap();
        assert_eq!(cell.gfc(), 1);
        assert_eq!(cell.vpi(), 0x23);
        assert_eq!(cell.vci(), 0x4567);
        assert_eq!(cell.payload_type(), 5);
        assert!(cell.clp());
    }

    #[test]
    fn pos_maps_ppp_protocols() {
        let bytes = [0xff, 0x03, 0x00, 0x21];
        let pos = PosHeader::new(&bytes).unwrap();
        assert_eq!(pos.address(), 0xff);
        assert_eq!(pos.ether_type(), 0x0800);
        let hdlc = [0x0f, 0x00, 0x86, 0xdd];
        assert_eq!(PosHeader::new(&hdlc).unwrap().ether_type(), 0x86dd);
    }

    #[test]
    fn wifi_header_length_follows_flags() {
        let mut frame = [0u8; 32];
        // data frame, QoS subtype, to_ds + from_ds
        frame[0] = (0x08 << 4) | (2 << 2);
        frame[1] = 0x03;
        let wifi = Ieee80211Header::new(&frame).unwrap();
        assert!(wifi.is_data());
        assert!(wifi.addr4().is_some());
        assert_eq!(wifi.header_len(), 32);
        assert!(Ieee80211Header::new(&frame[..31]).is_none());

        let mut plain = [0u8; 24];
        plain[0] = 2 << 2;
        let wifi = Ieee80211Header::new(&plain).unwrap();
        assert_eq!(wifi.header_len(), 24);
        assert!(wifi.addr4().is_none());
    }

    #[test]
    fn sll_fields() {
        let mut bytes = [0u8; 16];
        bytes[0..2].copy_from_slice(&4u16.to_be_bytes());
        bytes[2..4].copy_from_slice(&1u16.to_be_bytes());
        bytes[4..6].copy_from_slice(&6u16.to_be_bytes());
        bytes[6..12].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        bytes[14..16].copy_from_slice(&0x0800u16.to_be_bytes());
        let sll = SllHeader::new(&bytes).unwrap();
        assert_eq!(sll.packet_type(), 4);
        assert_eq!(sll.hardware_type(), 1);
        assert_eq!(sll.address(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(sll.protocol(), 0x0800);
    }

    #[test]
    fn pflog_declared_length_is_word_aligned() {
        let mut bytes = [0u8; 64];
        bytes[0] = 61;
        bytes[1] = 2;
        let pflog = PflogHeader::new(&bytes).unwrap();
        assert_eq!(pflog.header_len(), 64);
        assert_eq!(pflog.ether_type(), Some(0x0800));
        assert!(PflogHeader::new(&bytes[..60]).is_none());
    }
}
