//! Pcap and pcapng file provider (`pcapfile:`, alias `pcap:`).
//!
//! Input accepts legacy pcap (micro- or nanosecond) and pcapng, optionally
//! gzip-compressed, from a path or `-` for stdin. Blocks are parsed with
//! `pcap-parser`; each packet is copied into the packet's own buffer behind
//! a normalised record header (see [`layout`]). Output writes legacy pcap.

pub mod error;
pub(crate) mod layout;
pub mod parser;
pub(crate) mod reader;
pub mod writer;

use pcap_parser::Linktype;

use crate::format::{FormatEntry, PacketFormat};

pub use error::PcapFormatError;
pub use parser::PcapInput;
pub use writer::PcapOutput;

pub const NAME: &str = "pcapfile";

pub(crate) fn entry() -> FormatEntry {
    FormatEntry {
        name: NAME,
        aliases: &["pcap"],
        description: "pcap/pcapng files, optionally gzip-compressed",
        packet_format: PacketFormat::Pcap(Linktype::ETHERNET),
        input: Some(parser::open_input),
        output: Some(writer::open_output),
    }
}
