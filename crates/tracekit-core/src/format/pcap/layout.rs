//! Pcap constants and the normalised per-packet record header.
//!
//! Every packet read from a legacy pcap or pcapng file is stored behind the
//! same 16-byte little-endian header, whatever the on-disk variant:
//! seconds, nanoseconds, captured length, wire length.

use std::ops::Range;

use pcap_parser::Linktype;

use crate::format::{clamp_u32, le_u32, put_le_u32};
use crate::timestamp::Timestamp;

pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
pub const PCAP_READER_BUFFER_SIZE: usize = 256 * 1024;

pub const RECORD_HEADER_LEN: usize = 16;
pub const RECORD_TS_SEC_RANGE: Range<usize> = 0..4;
pub const RECORD_TS_NSEC_RANGE: Range<usize> = 4..8;
pub const RECORD_CAPLEN_RANGE: Range<usize> = 8..12;
pub const RECORD_WIRELEN_RANGE: Range<usize> = 12..16;

pub const FILE_MAGIC_MICROS: u32 = 0xa1b2_c3d4;
pub const FILE_MAGIC_NANOS: u32 = 0xa1b2_3c4d;
pub const FILE_VERSION_MAJOR: u16 = 2;
pub const FILE_VERSION_MINOR: u16 = 4;
pub const FILE_HEADER_LEN: usize = 24;
pub const FILE_SNAPLEN: u32 = 262_144;
pub const FILE_RECORD_HEADER_LEN: usize = 16;

/// Default pcapng timestamp resolution (microseconds).
pub const PCAPNG_DEFAULT_TSRESOL: u8 = 6;

pub(crate) fn record_header(ts: Timestamp, caplen: u32, wirelen: u32) -> [u8; RECORD_HEADER_LEN] {
    let mut header = [0u8; RECORD_HEADER_LEN];
    put_le_u32(&mut header, RECORD_TS_SEC_RANGE, ts.secs());
    put_le_u32(&mut header, RECORD_TS_NSEC_RANGE, ts.subsec_nanos());
    put_le_u32(&mut header, RECORD_CAPLEN_RANGE, caplen);
    put_le_u32(&mut header, RECORD_WIRELEN_RANGE, wirelen);
    header
}

pub(crate) fn capture_len(header: &[u8]) -> usize {
    le_u32(header, RECORD_CAPLEN_RANGE) as usize
}

pub(crate) fn wire_len(header: &[u8]) -> usize {
    le_u32(header, RECORD_WIRELEN_RANGE) as usize
}

pub(crate) fn timestamp(header: &[u8]) -> Timestamp {
    Timestamp::from_parts(
        le_u32(header, RECORD_TS_SEC_RANGE),
        le_u32(header, RECORD_TS_NSEC_RANGE),
    )
}

pub(crate) fn set_capture_len(header: &mut [u8], len: usize) {
    put_le_u32(header, RECORD_CAPLEN_RANGE, clamp_u32(len));
}

/// Legacy pcap global header, microsecond resolution, little-endian.
pub(crate) fn file_header(linktype: Linktype) -> [u8; FILE_HEADER_LEN] {
    let mut header = [0u8; FILE_HEADER_LEN];
    header[0..4].copy_from_slice(&FILE_MAGIC_MICROS.to_le_bytes());
    header[4..6].copy_from_slice(&FILE_VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&FILE_VERSION_MINOR.to_le_bytes());
    // thiszone and sigfigs stay zero
    header[16..20].copy_from_slice(&FILE_SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&(linktype.0 as u32).to_le_bytes());
    header
}

/// Link type and nanosecond flag of a little-endian legacy global header,
/// or `None` for any other magic. Bits above the low 16 of the link type
/// field carry FCS details and are ignored.
pub(crate) fn parse_file_header(header: &[u8; FILE_HEADER_LEN]) -> Option<(Linktype, bool)> {
    let nanos = match le_u32(header, 0..4) {
        FILE_MAGIC_MICROS => false,
        FILE_MAGIC_NANOS => true,
        _ => return None,
    };
    let linktype = Linktype((le_u32(header, 20..24) & 0xffff) as i32);
    Some((linktype, nanos))
}

/// Legacy pcap per-packet header, in micro- or nanoseconds as the file's
/// magic announces.
pub(crate) fn file_record_header(
    ts: Timestamp,
    caplen: u32,
    wirelen: u32,
    nanos: bool,
) -> [u8; FILE_RECORD_HEADER_LEN] {
    let fraction = if nanos {
        ts.subsec_nanos()
    } else {
        ts.subsec_micros()
    };
    let mut header = [0u8; FILE_RECORD_HEADER_LEN];
    header[0..4].copy_from_slice(&ts.secs().to_le_bytes());
    header[4..8].copy_from_slice(&fraction.to_le_bytes());
    header[8..12].copy_from_slice(&caplen.to_le_bytes());
    header[12..16].copy_from_slice(&wirelen.to_le_bytes());
    header
}
