//! Link-layer framing identifiers and their mappings onto the pcap DLT and
//! ERF record-type numbering.

use std::fmt;

use pcap_parser::Linktype;

/// What kind of link-layer header starts a packet's captured bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Cisco HDLC framing over POS links.
    HdlcPos,
    Ethernet,
    /// ATM cell header followed by LLC/SNAP.
    Atm,
    /// Reassembled AAL5 frame starting with LLC/SNAP.
    Aal5,
    Ieee80211,
    /// No link header: the packet starts with an IP header.
    None,
    LinuxSll,
    Pflog,
    /// PPP in HDLC-like framing.
    Pos,
    /// 802.11 behind a 144-byte Prism monitor header.
    Ieee80211Prism,
}

const DLT_EN10MB: i32 = 1;
const DLT_ATM_RFC1483: i32 = 11;
const DLT_RAW: i32 = 101;
const DLT_PPP_SERIAL: i32 = 50;
const DLT_C_HDLC: i32 = 104;
const DLT_IEEE802_11: i32 = 105;
const DLT_LINUX_SLL: i32 = 113;
const DLT_PFLOG: i32 = 117;
const DLT_PRISM_HEADER: i32 = 119;
const LINKTYPE_IPV4: i32 = 228;
const LINKTYPE_IPV6: i32 = 229;

pub const ERF_TYPE_HDLC_POS: u8 = 1;
pub const ERF_TYPE_ETH: u8 = 2;
pub const ERF_TYPE_ATM: u8 = 3;
pub const ERF_TYPE_AAL5: u8 = 4;

impl LinkType {
    /// Map a pcap link-layer header type. `DLT_NULL` is not supported: its
    /// host-order family word does not fit any framing here.
    ///
    /// # Examples
    /// ```
    /// use pcap_parser::Linktype;
    /// use tracekit_core::LinkType;
    ///
    /// assert_eq!(LinkType::from_dlt(Linktype(1)), Some(LinkType::Ethernet));
    /// assert_eq!(LinkType::from_dlt(Linktype(101)), Some(LinkType::None));
    /// assert_eq!(LinkType::from_dlt(Linktype(0)), None);
    /// ```
    pub fn from_dlt(dlt: Linktype) -> Option<Self> {
        match dlt.0 {
            DLT_EN10MB => Some(LinkType::Ethernet),
            DLT_ATM_RFC1483 => Some(LinkType::Aal5),
            DLT_RAW | LINKTYPE_IPV4 | LINKTYPE_IPV6 => Some(LinkType::None),
            DLT_PPP_SERIAL => Some(LinkType::Pos),
            DLT_C_HDLC => Some(LinkType::HdlcPos),
            DLT_IEEE802_11 => Some(LinkType::Ieee80211),
            DLT_LINUX_SLL => Some(LinkType::LinuxSll),
            DLT_PFLOG => Some(LinkType::Pflog),
            DLT_PRISM_HEADER => Some(LinkType::Ieee80211Prism),
            _ => None,
        }
    }

    /// Pcap link-layer header type for this framing. ATM cells have none.
    pub fn to_dlt(self) -> Option<Linktype> {
        let dlt = match self {
            LinkType::Ethernet => DLT_EN10MB,
            LinkType::Aal5 => DLT_ATM_RFC1483,
            LinkType::None => DLT_RAW,
            LinkType::Pos => DLT_PPP_SERIAL,
            LinkType::HdlcPos => DLT_C_HDLC,
            LinkType::Ieee80211 => DLT_IEEE802_11,
            LinkType::LinuxSll => DLT_LINUX_SLL,
            LinkType::Pflog => DLT_PFLOG,
            LinkType::Ieee80211Prism => DLT_PRISM_HEADER,
            LinkType::Atm => return None,
        };
        Some(Linktype(dlt))
    }

    pub fn from_erf_type(erf_type: u8) -> Option<Self> {
        match erf_type & 0x7f {
            ERF_TYPE_HDLC_POS => Some(LinkType::HdlcPos),
            ERF_TYPE_ETH => Some(LinkType::Ethernet),
            ERF_TYPE_ATM => Some(LinkType::Atm),
            ERF_TYPE_AAL5 => Some(LinkType::Aal5),
            _ => None,
        }
    }

    /// ERF record type able to carry this framing.
    pub fn to_erf_type(self) -> Option<u8> {
        match self {
            LinkType::HdlcPos | LinkType::Pos => Some(ERF_TYPE_HDLC_POS),
            LinkType::Ethernet => Some(ERF_TYPE_ETH),
            LinkType::Atm => Some(ERF_TYPE_ATM),
            LinkType::Aal5 => Some(ERF_TYPE_AAL5),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LinkType::HdlcPos => "hdlc-pos",
            LinkType::Ethernet => "ethernet",
            LinkType::Atm => "atm",
            LinkType::Aal5 => "aal5",
            LinkType::Ieee80211 => "ieee802.11",
            LinkType::None => "raw",
            LinkType::LinuxSll => "linux-sll",
            LinkType::Pflog => "pflog",
            LinkType::Pos => "pos",
            LinkType::Ieee80211Prism => "ieee802.11-prism",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
