//! Endace ERF file provider (`erf:`).
//!
//! Records are self-describing: each carries its own type, so one file may
//! mix link types. Uncompressed files are read through a memory map and
//! packets borrow the mapping; see [`layout`] for the record header.

pub mod error;
pub mod layout;
pub mod parser;
pub mod writer;

use crate::format::{FormatEntry, PacketFormat};

pub use error::ErfFormatError;
pub use parser::ErfInput;
pub use writer::ErfOutput;

pub const NAME: &str = "erf";

pub(crate) fn entry() -> FormatEntry {
    FormatEntry {
        name: NAME,
        aliases: &[],
        description: "Endace ERF files, memory-mapped when uncompressed",
        packet_format: PacketFormat::Erf,
        input: Some(parser::open_input),
        output: Some(writer::open_output),
    }
}
