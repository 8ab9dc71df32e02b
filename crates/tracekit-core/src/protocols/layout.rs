//! Byte offsets and ranges for every header view.
//!
//! All multi-byte fields are big-endian unless noted otherwise.

use std::ops::Range;

pub const MAC_LEN: usize = 6;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERNET_DST_RANGE: Range<usize> = 0..6;
pub const ETHERNET_SRC_RANGE: Range<usize> = 6..12;
pub const ETHERNET_TYPE_RANGE: Range<usize> = 12..14;
/// Values at or below this are 802.3 lengths, not EtherTypes.
pub const ETHERNET_MAX_LENGTH_FIELD: u16 = 1500;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_IPV6: u16 = 0x86dd;
pub const ETHERTYPE_QINQ: u16 = 0x88a8;
pub const ETHERTYPE_QINQ_LEGACY: u16 = 0x9100;

pub const VLAN_HEADER_LEN: usize = 4;
pub const VLAN_TCI_RANGE: Range<usize> = 0..2;
pub const VLAN_TYPE_RANGE: Range<usize> = 2..4;
pub const VLAN_PRIORITY_SHIFT: u16 = 13;
pub const VLAN_CFI_MASK: u16 = 0x1000;
pub const VLAN_ID_MASK: u16 = 0x0fff;

pub const LLCSNAP_HEADER_LEN: usize = 8;
pub const LLCSNAP_DSAP_OFFSET: usize = 0;
pub const LLCSNAP_SSAP_OFFSET: usize = 1;
pub const LLCSNAP_CONTROL_OFFSET: usize = 2;
pub const LLCSNAP_OUI_RANGE: Range<usize> = 3..6;
pub const LLCSNAP_TYPE_RANGE: Range<usize> = 6..8;
pub const LLC_SNAP_SAP: u8 = 0xaa;

/// Cell header without HEC: GFC(4) VPI(8) VCI(16) PT(3) CLP(1).
pub const ATM_HEADER_LEN: usize = 4;
pub const ATM_WORD_RANGE: Range<usize> = 0..4;
pub const ATM_GFC_SHIFT: u32 = 28;
pub const ATM_VPI_SHIFT: u32 = 20;
pub const ATM_VPI_MASK: u32 = 0xff;
pub const ATM_VCI_SHIFT: u32 = 4;
pub const ATM_VCI_MASK: u32 = 0xffff;
pub const ATM_PT_SHIFT: u32 = 1;
pub const ATM_PT_MASK: u32 = 0x07;
pub const ATM_CLP_MASK: u32 = 0x01;

pub const POS_HEADER_LEN: usize = 4;
pub const POS_ADDRESS_OFFSET: usize = 0;
pub const POS_CONTROL_OFFSET: usize = 1;
pub const POS_PROTOCOL_RANGE: Range<usize> = 2..4;
pub const PPP_PROTOCOL_IPV4: u16 = 0x0021;
pub const PPP_PROTOCOL_IPV6: u16 = 0x0057;

/// 802.11 fields are little-endian on the wire.
pub const WIFI_HEADER_LEN: usize = 24;
pub const WIFI_FC_RANGE: Range<usize> = 0..2;
pub const WIFI_DURATION_RANGE: Range<usize> = 2..4;
pub const WIFI_ADDR1_RANGE: Range<usize> = 4..10;
pub const WIFI_ADDR2_RANGE: Range<usize> = 10..16;
pub const WIFI_ADDR3_RANGE: Range<usize> = 16..22;
pub const WIFI_SEQ_RANGE: Range<usize> = 22..24;
pub const WIFI_ADDR4_RANGE: Range<usize> = 24..30;
pub const WIFI_ADDR4_HEADER_LEN: usize = 30;
pub const WIFI_QOS_LEN: usize = 2;
pub const WIFI_TYPE_DATA: u8 = 2;
pub const WIFI_SUBTYPE_QOS_BIT: u8 = 0x08;
pub const WIFI_FLAG_TO_DS: u8 = 0x01;
pub const WIFI_FLAG_FROM_DS: u8 = 0x02;
pub const WIFI_FLAG_MORE_FRAGMENTS: u8 = 0x04;
pub const WIFI_FLAG_RETRY: u8 = 0x08;
pub const WIFI_FLAG_PROTECTED: u8 = 0x40;
pub const PRISM_HEADER_LEN: usize = 144;

pub const SLL_HEADER_LEN: usize = 16;
pub const SLL_PKTTYPE_RANGE: Range<usize> = 0..2;
pub const SLL_HATYPE_RANGE: Range<usize> = 2..4;
pub const SLL_HALEN_RANGE: Range<usize> = 4..6;
pub const SLL_ADDR_RANGE: Range<usize> = 6..14;
pub const SLL_PROTOCOL_RANGE: Range<usize> = 14..16;

pub const PFLOG_MIN_LEN: usize = 4;
pub const PFLOG_LENGTH_OFFSET: usize = 0;
pub const PFLOG_AF_OFFSET: usize = 1;
pub const PFLOG_ACTION_OFFSET: usize = 2;
pub const PFLOG_REASON_OFFSET: usize = 3;
pub const PFLOG_ALIGN: usize = 4;
pub const AF_INET: u8 = 2;
/// AF_INET6 differs across the BSDs and Linux.
pub const AF_INET6_VALUES: [u8; 4] = [10, 24, 28, 30];

pub const IPV4_HEADER_LEN: usize = 20;
pub const IPV4_VERSION_IHL_OFFSET: usize = 0;
pub const IPV4_TOS_OFFSET: usize = 1;
pub const IPV4_TOTAL_LEN_RANGE: Range<usize> = 2..4;
pub const IPV4_ID_RANGE: Range<usize> = 4..6;
pub const IPV4_FRAG_RANGE: Range<usize> = 6..8;
pub const IPV4_TTL_OFFSET: usize = 8;
pub const IPV4_PROTOCOL_OFFSET: usize = 9;
pub const IPV4_CHECKSUM_RANGE: Range<usize> = 10..12;
pub const IPV4_SRC_RANGE: Range<usize> = 12..16;
pub const IPV4_DST_RANGE: Range<usize> = 16..20;
pub const IPV4_FLAG_DF: u16 = 0x4000;
pub const IPV4_FLAG_MF: u16 = 0x2000;
pub const IPV4_FRAG_OFFSET_MASK: u16 = 0x1fff;
pub const IPV4_MIN_IHL: u8 = 5;

pub const IPV6_HEADER_LEN: usize = 40;
pub const IPV6_VTF_RANGE: Range<usize> = 0..4;
pub const IPV6_PAYLOAD_LEN_RANGE: Range<usize> = 4..6;
pub const IPV6_NEXT_HEADER_OFFSET: usize = 6;
pub const IPV6_HOP_LIMIT_OFFSET: usize = 7;
pub const IPV6_SRC_RANGE: Range<usize> = 8..24;
pub const IPV6_DST_RANGE: Range<usize> = 24..40;
pub const IPV6_EXT_MIN_LEN: usize = 8;
pub const IPV6_FRAG_OFFSET_RANGE: Range<usize> = 2..4;
pub const IPV6_FRAG_OFFSET_MASK: u16 = 0xfff8;

pub const IPPROTO_HOPOPTS: u8 = 0;
pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ROUTING: u8 = 43;
pub const IPPROTO_FRAGMENT: u8 = 44;
pub const IPPROTO_AH: u8 = 51;
pub const IPPROTO_ICMPV6: u8 = 58;
pub const IPPROTO_DSTOPTS: u8 = 60;
pub const IPPROTO_MOBILITY: u8 = 135;

pub const TCP_HEADER_LEN: usize = 20;
pub const TCP_SRC_PORT_RANGE: Range<usize> = 0..2;
pub const TCP_DST_PORT_RANGE: Range<usize> = 2..4;
pub const TCP_SEQ_RANGE: Range<usize> = 4..8;
pub const TCP_ACK_RANGE: Range<usize> = 8..12;
pub const TCP_DOFF_OFFSET: usize = 12;
pub const TCP_FLAGS_OFFSET: usize = 13;
pub const TCP_WINDOW_RANGE: Range<usize> = 14..16;
pub const TCP_CHECKSUM_RANGE: Range<usize> = 16..18;
pub const TCP_URGENT_RANGE: Range<usize> = 18..20;
pub const TCP_MIN_DOFF: u8 = 5;

pub const UDP_HEADER_LEN: usize = 8;
pub const UDP_SRC_PORT_RANGE: Range<usize> = 0..2;
pub const UDP_DST_PORT_RANGE: Range<usize> = 2..4;
pub const UDP_LENGTH_RANGE: Range<usize> = 4..6;
pub const UDP_CHECKSUM_RANGE: Range<usize> = 6..8;

pub const ICMP_HEADER_LEN: usize = 8;
pub const ICMP_TYPE_OFFSET: usize = 0;
pub const ICMP_CODE_OFFSET: usize = 1;
pub const ICMP_CHECKSUM_RANGE: Range<usize> = 2..4;
pub const ICMP_ECHO_ID_RANGE: Range<usize> = 4..6;
pub const ICMP_ECHO_SEQ_RANGE: Range<usize> = 6..8;
pub const ICMP_GATEWAY_RANGE: Range<usize> = 4..8;
pub const ICMP_FRAG_MTU_RANGE: Range<usize> = 6..8;
