//! ERF record header layout.
//!
//! ```text
//!  0      8     9      10     12     14     16
//!  | ts   | type | flags | rlen | lctr | wlen | [pad: 2 for Ethernet]
//! ```
//!
//! The timestamp is little-endian 32.32 fixed point; the length and loss
//! counters are big-endian. `rlen` covers the whole record including the
//! header and any trailing padding.

use std::ops::Range;

use crate::error::TraceError;
use crate::format::Direction;
use crate::linktype::{ERF_TYPE_ETH, LinkType};
use crate::timestamp::Timestamp;

pub const RECORD_HEADER_LEN: usize = 16;
pub const TS_RANGE: Range<usize> = 0..8;
pub const TYPE_OFFSET: usize = 8;
pub const FLAGS_OFFSET: usize = 9;
pub const RLEN_RANGE: Range<usize> = 10..12;
pub const LCTR_RANGE: Range<usize> = 12..14;
pub const WLEN_RANGE: Range<usize> = 14..16;

/// Ethernet records carry two bytes of padding before the frame.
pub const ETH_PAD_LEN: usize = 2;
pub const ETH_FRAMING_LEN: usize = RECORD_HEADER_LEN + ETH_PAD_LEN;

/// Interface (direction) bits of the flags byte.
pub const FLAGS_IFACE_MASK: u8 = 0x03;
/// Record has been truncated by the capture card.
pub const FLAGS_TRUNCATED: u8 = 0x08;
/// Type byte bit announcing extension headers.
pub const TYPE_EXTENSION_BIT: u8 = 0x80;

/// Largest record an `rlen` field can describe.
pub const MAX_RECORD_LEN: usize = u16::MAX as usize;

fn be_u16(header: &[u8], range: Range<usize>) -> u16 {
    match header.get(range) {
        Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]),
        _ => 0,
    }
}

fn put_be_u16(header: &mut [u8], range: Range<usize>, value: u16) {
    if let Some(dst) = header.get_mut(range) {
        if dst.len() == 2 {
            dst.copy_from_slice(&value.to_be_bytes());
        }
    }
}

/// Record type with the extension bit cleared.
pub fn erf_type(header: &[u8]) -> u8 {
    header.get(TYPE_OFFSET).copied().unwrap_or(0) & !TYPE_EXTENSION_BIT
}

/// Header bytes in front of the link-layer data for a record type.
pub fn framing_len(erf_type: u8) -> usize {
    if erf_type & !TYPE_EXTENSION_BIT == ERF_TYPE_ETH {
        ETH_FRAMING_LEN
    } else {
        RECORD_HEADER_LEN
    }
}

pub fn record_len(header: &[u8]) -> usize {
    usize::from(be_u16(header, RLEN_RANGE))
}

/// Packets the capture card dropped before this record.
pub fn loss_counter(header: &[u8]) -> u16 {
    be_u16(header, LCTR_RANGE)
}

/// Build the framing for one record, padding included.
pub(crate) fn record_header(
    ts: Timestamp,
    erf_type: u8,
    direction: Option<Direction>,
    caplen: usize,
    wlen: usize,
) -> Vec<u8> {
    let framing = framing_len(erf_type);
    let mut header = vec![0u8; framing];
    header[TS_RANGE].copy_from_slice(&ts.erf().to_le_bytes());
    header[TYPE_OFFSET] = erf_type;
    header[FLAGS_OFFSET] = direction.map_or(0, |dir| dir.bits() & FLAGS_IFACE_MASK);
    let rlen = (framing + caplen).min(MAX_RECORD_LEN);
    put_be_u16(&mut header, RLEN_RANGE, rlen as u16);
    put_be_u16(&mut header, WLEN_RANGE, wlen.min(MAX_RECORD_LEN) as u16);
    header
}

pub(crate) fn link_type(header: &[u8]) -> Option<LinkType> {
    LinkType::from_erf_type(erf_type(header))
}

pub(crate) fn capture_len(header: &[u8]) -> usize {
    record_len(header).saturating_sub(framing_len(erf_type(header)))
}

pub(crate) fn wire_len(header: &[u8]) -> usize {
    usize::from(be_u16(header, WLEN_RANGE))
}

pub(crate) fn timestamp(header: &[u8]) -> Timestamp {
    let mut raw = [0u8; 8];
    if let Some(src) = header.get(TS_RANGE) {
        raw.copy_from_slice(src);
    }
    Timestamp::from_erf(u64::from_le_bytes(raw))
}

pub(crate) fn direction(header: &[u8]) -> Option<Direction> {
    let flags = header.get(FLAGS_OFFSET)?;
    Some(Direction::from_bits(flags & FLAGS_IFACE_MASK))
}

/// # Errors
/// `Unsupported` for an interface number wider than the flag bits.
pub(crate) fn set_direction(header: &mut [u8], direction: Direction) -> Result<(), TraceError> {
    let bits = direction.bits();
    if bits > FLAGS_IFACE_MASK {
        return Err(TraceError::Unsupported(format!(
            "ERF interface {bits} (at most {FLAGS_IFACE_MASK})"
        )));
    }
    if let Some(flags) = header.get_mut(FLAGS_OFFSET) {
        *flags = (*flags & !FLAGS_IFACE_MASK) | bits;
    }
    Ok(())
}

pub(crate) fn set_capture_len(header: &mut [u8], len: usize) {
    let rlen = (framing_len(erf_type(header)) + len).min(MAX_RECORD_LEN);
    put_be_u16(header, RLEN_RANGE, rlen as u16);
}
