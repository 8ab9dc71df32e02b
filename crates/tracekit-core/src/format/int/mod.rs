//! Live capture provider (`int:<interface>`), Linux only.
//!
//! Frames are read from an `AF_PACKET` raw socket and stored behind the
//! native header in [`layout`], which records the kernel's packet type so
//! the direction of travel is known.

pub mod layout;
#[cfg(target_os = "linux")]
pub mod socket;

use crate::format::FormatEntry;

#[cfg(target_os = "linux")]
pub use socket::IntInput;

pub const NAME: &str = "int";

/// The registry entry, on platforms with `AF_PACKET`.
#[cfg(target_os = "linux")]
pub(crate) fn entry() -> Option<FormatEntry> {
    use crate::format::PacketFormat;
    use crate::linktype::LinkType;

    Some(FormatEntry {
        name: NAME,
        aliases: &[],
        description: "live capture from a network interface (AF_PACKET)",
        packet_format: PacketFormat::Native(LinkType::Ethernet),
        input: Some(socket::open_input),
        output: None,
    })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn entry() -> Option<FormatEntry> {
    None
}
