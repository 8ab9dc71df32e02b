//! Streamed relay client (`rtclient:host[:port]`).
//!
//! The relay sends a continuous stream of ERF records over TCP. Packets are
//! split out of the receive buffer without copying and carry ERF framing.

pub mod client;

use crate::format::{FormatEntry, PacketFormat};

pub use client::RtInput;

pub const NAME: &str = "rtclient";
pub const DEFAULT_PORT: u16 = 3435;

pub(crate) fn entry() -> FormatEntry {
    FormatEntry {
        name: NAME,
        aliases: &[],
        description: "ERF records streamed from a relay over TCP",
        packet_format: PacketFormat::Erf,
        input: Some(client::open_input),
        output: None,
    }
}
