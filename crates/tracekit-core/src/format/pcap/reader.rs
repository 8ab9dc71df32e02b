use std::io::{self, Chain, Cursor, Read};

use pcap_parser::Linktype;

use super::error::PcapFormatError;
use super::layout;
use crate::format::io::read_full;
use crate::timestamp::Timestamp;

/// Stream with its magic bytes put back in front.
pub(crate) type MagicStream<R> = FillingReader<Chain<Cursor<[u8; 4]>, R>>;

/// A reader whose first `read` returns short only at end of stream.
///
/// pcap-parser parses the file header from the result of a single `read`,
/// which a chained or decompressing stream may cut short. Later reads pass
/// straight through so a slow pipe is not held up.
#[derive(Debug)]
pub(crate) struct FillingReader<R> {
    inner: R,
    primed: bool,
}

impl<R: Read> Read for FillingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.primed {
            return self.inner.read(buf);
        }
        self.primed = true;
        read_full(&mut self.inner, buf)
    }
}

/// Read the magic bytes and return a stream that still starts with them.
///
/// Works on unseekable input (stdin, gzip) by chaining the bytes back.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use std::io::Read;
///
/// let (magic, mut stream) = read_magic(&[0x0a, 0x0d, 0x0d, 0x0a, 0x01][..]).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// let mut all = [0u8; 8];
/// assert_eq!(stream.read(&mut all).unwrap(), 5);
/// ```
///
/// # Errors
/// Returns `PcapFormatError::Io` when fewer than four bytes can be read.
pub(crate) fn read_magic<R: Read>(mut reader: R) -> Result<([u8; 4], MagicStream<R>), PcapFormatError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    Ok((
        magic,
        FillingReader {
            inner: Cursor::new(magic).chain(reader),
            primed: false,
        },
    ))
}

/// Check whether the magic bytes match PCAPNG.
pub(crate) fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Whether a legacy header magic announces nanosecond timestamps, in
/// either byte order.
pub(crate) fn is_nanosecond_magic(magic: u32) -> bool {
    magic == layout::FILE_MAGIC_NANOS || magic.swap_bytes() == layout::FILE_MAGIC_NANOS
}

/// Link type and clock resolution of one pcapng interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interface {
    pub linktype: Linktype,
    pub tsresol: u8,
}

impl Default for Interface {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            tsresol: layout::PCAPNG_DEFAULT_TSRESOL,
        }
    }
}

/// Resolve the interface for a given id, defaulting to Ethernet with
/// microsecond timestamps.
pub(crate) fn interface_for_id(interfaces: &[Interface], if_id: u32) -> Interface {
    interfaces.get(if_id as usize).copied().unwrap_or_default()
}

/// Convert a pcapng 64-bit timestamp in units of `tsresol`.
///
/// The resolution byte is a negative power of ten, or of two when its high
/// bit is set.
pub(crate) fn pcapng_timestamp(ts_high: u32, ts_low: u32, tsresol: u8) -> Timestamp {
    let units = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let exponent = u32::from(tsresol & 0x7f);
    let (secs, nanos) = if tsresol & 0x80 != 0 {
        let exponent = exponent.min(63);
        let secs = units >> exponent;
        let frac = u128::from(units & ((1u64 << exponent) - 1));
        (secs, ((frac * 1_000_000_000) >> exponent) as u64)
    } else {
        let exponent = exponent.min(19);
        let per_sec = 10u64.pow(exponent);
        let rem = units % per_sec;
        let nanos = if exponent <= 9 {
            rem * 10u64.pow(9 - exponent)
        } else {
            rem / 10u64.pow(exponent - 9)
        };
        (units / per_sec, nanos)
    };
    Timestamp::from_parts(u32::try_from(secs).unwrap_or(u32::MAX), nanos as u32)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use pcap_parser::Linktype;

    use super::{
        Interface, interface_for_id, is_nanosecond_magic, is_pcapng_magic, pcapng_timestamp,
        read_magic,
    };
    use crate::format::pcap::error::PcapFormatError;
    use crate::format::pcap::layout;

    #[test]
    fn detect_pcapng_magic() {
        assert!(is_pcapng_magic(&layout::PCAPNG_MAGIC));
        assert!(!is_pcapng_magic(&[0xd4, 0xc3, 0xb2, 0xa1]));
    }

    #[test]
    fn read_magic_puts_bytes_back() {
        let bytes: &[u8] = &[0x0a, 0x0d, 0x0d, 0x0a, 0x01];
        let (magic, mut stream) = read_magic(bytes).unwrap();
        assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
        let mut all = Vec::new();
        stream.read_to_end(&mut all).unwrap();
        assert_eq!(all, bytes);
    }

    #[test]
    fn first_read_spans_the_restored_magic() {
        // a header split across the magic and the rest of the stream
        let bytes: Vec<u8> = (0u8..24).collect();
        let (_, mut stream) = read_magic(&bytes[..]).unwrap();
        let mut header = [0u8; 24];
        assert_eq!(stream.read(&mut header).unwrap(), 24);
        assert_eq!(&header[..], &bytes[..]);
        let mut rest = [0u8; 4];
        assert_eq!(stream.read(&mut rest).unwrap(), 0);
    }

    #[test]
    fn read_magic_too_short() {
        let bytes: &[u8] = &[0x0a, 0x0d, 0x0d];
        let err = read_magic(bytes).unwrap_err();
        assert!(matches!(err, PcapFormatError::Io(_)));
    }

    #[test]
    fn nanosecond_magic_either_order() {
        assert!(is_nanosecond_magic(0xa1b2_3c4d));
        assert!(is_nanosecond_magic(0x4d3c_b2a1));
        assert!(!is_nanosecond_magic(0xa1b2_c3d4));
    }

    #[test]
    fn interface_defaults_to_ethernet_microseconds() {
        let interfaces = [Interface {
            linktype: Linktype::RAW,
            tsresol: 9,
        }];
        assert_eq!(interface_for_id(&interfaces, 0).linktype, Linktype::RAW);
        assert_eq!(interface_for_id(&interfaces, 1), Interface::default());
    }

    #[test]
    fn pcapng_timestamps_by_resolution() {
        let micros = pcapng_timestamp(0, 1_500_000, 6);
        assert_eq!((micros.secs(), micros.subsec_nanos()), (1, 500_000_000));

        let nanos = pcapng_timestamp(0, 2_000_000_007, 9);
        assert_eq!((nanos.secs(), nanos.subsec_nanos()), (2, 7));

        // 2^-10 seconds per unit
        let binary = pcapng_timestamp(0, 3 * 1024 + 512, 0x80 | 10);
        assert_eq!((binary.secs(), binary.subsec_nanos()), (3, 500_000_000));
    }
}
