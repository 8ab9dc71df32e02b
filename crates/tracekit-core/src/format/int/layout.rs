//! Framing header for live-captured packets.
//!
//! ```text
//!  0        4         8        12        16        17   20
//!  | ts_sec | ts_nsec | caplen | wirelen | pkttype | pad |
//! ```
//!
//! Little-endian, like the pcap record header. `pkttype` is the kernel's
//! packet classification (`PACKET_HOST`, `PACKET_OUTGOING`, ...).

use std::ops::Range;

use crate::error::TraceError;
use crate::format::{Direction, clamp_u32, le_u32, put_le_u32};
use crate::timestamp::Timestamp;

pub const HEADER_LEN: usize = 20;
pub const TS_SEC_RANGE: Range<usize> = 0..4;
pub const TS_NSEC_RANGE: Range<usize> = 4..8;
pub const CAPLEN_RANGE: Range<usize> = 8..12;
pub const WIRELEN_RANGE: Range<usize> = 12..16;
pub const PKTTYPE_OFFSET: usize = 16;

/// Addressed to this host.
pub const PACKET_HOST: u8 = 0;
/// Sent by this host.
pub const PACKET_OUTGOING: u8 = 4;

pub(crate) fn record_header(
    ts: Timestamp,
    caplen: usize,
    wirelen: usize,
    pkttype: u8,
) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    put_le_u32(&mut header, TS_SEC_RANGE, ts.secs());
    put_le_u32(&mut header, TS_NSEC_RANGE, ts.subsec_nanos());
    put_le_u32(&mut header, CAPLEN_RANGE, clamp_u32(caplen));
    put_le_u32(&mut header, WIRELEN_RANGE, clamp_u32(wirelen));
    header[PKTTYPE_OFFSET] = pkttype;
    header
}

pub(crate) fn capture_len(header: &[u8]) -> usize {
    le_u32(header, CAPLEN_RANGE) as usize
}

pub(crate) fn wire_len(header: &[u8]) -> usize {
    le_u32(header, WIRELEN_RANGE) as usize
}

pub(crate) fn timestamp(header: &[u8]) -> Timestamp {
    Timestamp::from_parts(le_u32(header, TS_SEC_RANGE), le_u32(header, TS_NSEC_RANGE))
}

pub(crate) fn direction(header: &[u8]) -> Option<Direction> {
    match *header.get(PKTTYPE_OFFSET)? {
        PACKET_OUTGOING => Some(Direction::Outbound),
        _ => Some(Direction::Inbound),
    }
}

/// # Errors
/// `Unsupported` for interface numbers, which have no packet-type
/// equivalent.
pub(crate) fn set_direction(header: &mut [u8], direction: Direction) -> Result<(), TraceError> {
    let pkttype = match direction {
        Direction::Outbound => PACKET_OUTGOING,
        Direction::Inbound => PACKET_HOST,
        Direction::Interface(n) => {
            return Err(TraceError::Unsupported(format!(
                "interface {n} as the direction of a live packet"
            )));
        }
    };
    if let Some(slot) = header.get_mut(PKTTYPE_OFFSET) {
        *slot = pkttype;
    }
    Ok(())
}

pub(crate) fn set_capture_len(header: &mut [u8], len: usize) {
    put_le_u32(header, CAPLEN_RANGE, clamp_u32(len));
}

#[cfg(test)]
mod tests {
    use super::{
        HEADER_LEN, PACKET_OUTGOING, capture_len, direction, record_header, set_capture_len,
        set_direction, timestamp, wire_len,
    };
    use crate::error::ErrorKind;
    use crate::format::Direction;
    use crate::timestamp::Timestamp;

    #[test]
    fn header_fields() {
        let ts = Timestamp::from_parts(77, 1_000);
        let mut header = record_header(ts, 60, 1500, PACKET_OUTGOING);
        assert_eq!(header.len(), HEADER_LEN);
        assert_eq!(capture_len(&header), 60);
        assert_eq!(wire_len(&header), 1500);
        assert_eq!(timestamp(&header), ts);
        assert_eq!(direction(&header), Some(Direction::Outbound));
        set_capture_len(&mut header, 14);
        assert_eq!(capture_len(&header), 14);
    }

    #[test]
    fn direction_maps_onto_packet_type() {
        let mut header = record_header(Timestamp::default(), 0, 0, 3);
        assert_eq!(direction(&header), Some(Direction::Inbound));
        set_direction(&mut header, Direction::Outbound).unwrap();
        assert_eq!(header[16], PACKET_OUTGOING);
        let err = set_direction(&mut header, Direction::Interface(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(header[16], PACKET_OUTGOING);
        set_direction(&mut header, Direction::Inbound).unwrap();
        assert_eq!(header[16], 0);
    }
}
