//! Format providers and the registry that maps URI prefixes to them.
//!
//! A provider implements [`InputFormat`] and/or [`OutputFormat`] for one
//! trace kind: file replay (`pcapfile`, `erf`), streamed relay (`rtclient`)
//! or live capture (`int`). Handles own exactly one boxed provider and drive
//! it through the lifecycle; providers never see handle state directly.
//!
//! Packets keep a [`PacketFormat`] tag instead of a reference to the
//! provider that produced them. The tag selects how the framing header is
//! interpreted, so a packet stays usable after its trace is gone.

use std::ops::Range;
use std::sync::OnceLock;

use crate::config::{InputConfig, OutputConfig, OutputOption, TraceOption};
use crate::error::TraceError;
use crate::event::TraceEvent;
use crate::linktype::LinkType;
use crate::packet::Packet;
use crate::timestamp::Timestamp;

pub mod erf;
pub mod int;
pub(crate) mod io;
pub mod pcap;
pub(crate) mod replay;
pub mod rt;

/// Framing of a packet's buffer, named after the provider family that
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFormat {
    /// Normalised pcap record header, tagged with the capture's DLT.
    Pcap(pcap_parser::Linktype),
    /// ERF record header.
    Erf,
    /// Live-capture header, tagged with the interface's framing.
    Native(LinkType),
}

/// Direction of travel, or the capture interface for ERF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by the capturing host.
    Outbound,
    /// Received by the capturing host.
    Inbound,
    /// Any other interface number.
    Interface(u8),
}

impl Direction {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Direction::Outbound,
            1 => Direction::Inbound,
            other => Direction::Interface(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Direction::Outbound => 0,
            Direction::Inbound => 1,
            Direction::Interface(n) => n,
        }
    }
}

impl PacketFormat {
    pub fn name(self) -> &'static str {
        match self {
            PacketFormat::Pcap(_) => pcap::NAME,
            PacketFormat::Erf => erf::NAME,
            PacketFormat::Native(_) => int::NAME,
        }
    }

    pub(crate) fn link_type(self, header: &[u8]) -> Option<LinkType> {
        match self {
            PacketFormat::Pcap(dlt) => LinkType::from_dlt(dlt),
            PacketFormat::Erf => erf::layout::link_type(header),
            PacketFormat::Native(link) => Some(link),
        }
    }

    pub(crate) fn capture_length(self, header: &[u8]) -> usize {
        match self {
            PacketFormat::Pcap(_) => pcap::layout::capture_len(header),
            PacketFormat::Erf => erf::layout::capture_len(header),
            PacketFormat::Native(_) => int::layout::capture_len(header),
        }
    }

    pub(crate) fn wire_length(self, header: &[u8]) -> usize {
        match self {
            PacketFormat::Pcap(_) => pcap::layout::wire_len(header),
            PacketFormat::Erf => erf::layout::wire_len(header),
            PacketFormat::Native(_) => int::layout::wire_len(header),
        }
    }

    pub(crate) fn timestamp(self, header: &[u8]) -> Timestamp {
        match self {
            PacketFormat::Pcap(_) => pcap::layout::timestamp(header),
            PacketFormat::Erf => erf::layout::timestamp(header),
            PacketFormat::Native(_) => int::layout::timestamp(header),
        }
    }

    pub(crate) fn direction(self, header: &[u8]) -> Option<Direction> {
        match self {
            PacketFormat::Pcap(_) => None,
            PacketFormat::Erf => erf::layout::direction(header),
            PacketFormat::Native(_) => int::layout::direction(header),
        }
    }

    pub(crate) fn set_direction(
        self,
        header: &mut [u8],
        direction: Direction,
    ) -> Result<(), TraceError> {
        match self {
            PacketFormat::Pcap(_) => Err(TraceError::Unsupported(format!(
                "{} packets carry no direction",
                self.name()
            ))),
            PacketFormat::Erf => erf::layout::set_direction(header, direction),
            PacketFormat::Native(_) => int::layout::set_direction(header, direction),
        }
    }

    pub(crate) fn set_capture_length(self, header: &mut [u8], len: usize) {
        match self {
            PacketFormat::Pcap(_) => pcap::layout::set_capture_len(header, len),
            PacketFormat::Erf => erf::layout::set_capture_len(header, len),
            PacketFormat::Native(_) => int::layout::set_capture_len(header, len),
        }
    }
}

/// A source of packets.
///
/// Option validation happens in [`InputFormat::config`]; the handle keeps the
/// accepted values and hands them to [`InputFormat::start`]. Snaplen and
/// filters are additionally enforced by the handle after every read.
pub trait InputFormat: Send {
    /// Accept or reject an option for this provider.
    ///
    /// # Errors
    /// `OptionUnavailable` when the provider cannot honour the option.
    fn config(&mut self, option: &TraceOption) -> Result<(), TraceError>;

    /// Begin (or resume) delivery with the staged configuration.
    fn start(&mut self, config: &InputConfig) -> Result<(), TraceError>;

    /// Stop delivery and drop anything in flight.
    fn pause(&mut self) -> Result<(), TraceError>;

    /// Block until a packet is available and load it into `packet`.
    ///
    /// Returns the number of bytes consumed from the source, or `0` at the
    /// end of the trace. On error `packet` is left untouched.
    fn read_packet(&mut self, packet: &mut Packet) -> Result<usize, TraceError>;

    /// One non-blocking step of the event engine.
    fn event(&mut self, packet: &mut Packet) -> Result<TraceEvent, TraceError>;

    /// Position the source so the next read returns the first packet at or
    /// after `target`. Only called while not running.
    fn seek(&mut self, target: Timestamp) -> Result<(), TraceError> {
        let _ = target;
        Err(TraceError::Unsupported("seeking".into()))
    }

    /// Release every resource. Called exactly once, when the handle is
    /// destroyed.
    fn fin(&mut self) {}
}

/// A sink for packets.
pub trait OutputFormat: Send {
    fn config(&mut self, option: &OutputOption) -> Result<(), TraceError>;

    /// Open the destination with the staged configuration.
    fn start(&mut self, config: &OutputConfig) -> Result<(), TraceError>;

    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// `NoConversion` when the packet cannot be represented.
    fn write_packet(&mut self, packet: &Packet) -> Result<usize, TraceError>;

    /// Flush and close the destination. Called exactly once.
    fn fin(&mut self) -> Result<(), TraceError>;
}

pub type InputConstructor = fn(&str) -> Result<Box<dyn InputFormat>, TraceError>;
pub type OutputConstructor = fn(&str) -> Result<Box<dyn OutputFormat>, TraceError>;

/// One registered provider family.
#[derive(Debug, Clone)]
pub struct FormatEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Framing of packets built by format-only handles.
    pub packet_format: PacketFormat,
    pub input: Option<InputConstructor>,
    pub output: Option<OutputConstructor>,
}

impl FormatEntry {
    fn answers_to(&self, id: &str) -> bool {
        self.name == id || self.aliases.contains(&id)
    }
}

/// Provider constructors keyed by URI prefix.
///
/// # Examples
/// ```
/// use tracekit_core::Registry;
///
/// let registry = Registry::builtin();
/// assert!(registry.lookup("pcap").is_some());
/// assert!(registry.lookup("erf").unwrap().output.is_some());
/// assert!(registry.lookup("rtclient").unwrap().output.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<FormatEntry>,
}

impl Registry {
    /// A registry holding every provider compiled into this crate.
    pub fn builtin() -> Self {
        let mut registry = Registry::default();
        registry.register(pcap::entry());
        registry.register(erf::entry());
        registry.register(rt::entry());
        if let Some(entry) = int::entry() {
            registry.register(entry);
        }
        registry
    }

    /// Add an entry, replacing any entry with the same name.
    pub fn register(&mut self, entry: FormatEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&FormatEntry> {
        self.entries.iter().find(|entry| entry.answers_to(id))
    }

    pub fn entries(&self) -> impl Iterator<Item = &FormatEntry> {
        self.entries.iter()
    }
}

/// The process-wide registry of built-in providers.
pub(crate) fn builtin() -> &'static Registry {
    static BUILTIN: OnceLock<Registry> = OnceLock::new();
    BUILTIN.get_or_init(Registry::builtin)
}

pub(crate) fn le_u32(bytes: &[u8], range: Range<usize>) -> u32 {
    let mut word = [0u8; 4];
    if let Some(src) = bytes.get(range) {
        if src.len() == 4 {
            word.copy_from_slice(src);
        }
    }
    u32::from_le_bytes(word)
}

pub(crate) fn put_le_u32(bytes: &mut [u8], range: Range<usize>, value: u32) {
    if let Some(dst) = bytes.get_mut(range) {
        if dst.len() == 4 {
            dst.copy_from_slice(&value.to_le_bytes());
        }
    }
}

/// Saturating conversion for length fields.
pub(crate) fn clamp_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{Direction, FormatEntry, PacketFormat, Registry};
    use crate::linktype::LinkType;

    #[test]
    fn builtin_registry_resolves_aliases() {
        let registry = Registry::builtin();
        let pcap = registry.lookup("pcap").unwrap();
        assert_eq!(pcap.name, "pcapfile");
        assert!(pcap.input.is_some() && pcap.output.is_some());
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn register_replaces_by_name() {
        let mut registry = Registry::default();
        let entry = FormatEntry {
            name: "custom",
            aliases: &[],
            description: "first",
            packet_format: PacketFormat::Native(LinkType::Ethernet),
            input: None,
            output: None,
        };
        registry.register(entry.clone());
        registry.register(FormatEntry {
            description: "second",
            ..entry
        });
        assert_eq!(registry.entries().count(), 1);
        assert_eq!(registry.lookup("custom").unwrap().description, "second");
    }

    #[test]
    fn direction_bits() {
        assert_eq!(Direction::from_bits(0), Direction::Outbound);
        assert_eq!(Direction::from_bits(1), Direction::Inbound);
        assert_eq!(Direction::from_bits(3), Direction::Interface(3));
        assert_eq!(Direction::Interface(2).bits(), 2);
    }
}
