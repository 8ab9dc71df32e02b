use std::ops::Range;

/// Bounds-checked field access over a header's bytes.
///
/// A reader is only built once the caller has proved the fixed part of the
/// header is present, so accessors fall back to zero instead of failing for
/// offsets inside that part.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Wrap `bytes` when at least `needed` of them are present.
    pub(crate) fn with_len(bytes: &'a [u8], needed: usize) -> Option<Self> {
        if bytes.len() < needed {
            return None;
        }
        Some(Self { bytes })
    }

    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub(crate) fn u8_at(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    pub(crate) fn u16_be(&self, range: Range<usize>) -> u16 {
        u16::from_be_bytes(self.array(range))
    }

    pub(crate) fn u16_le(&self, range: Range<usize>) -> u16 {
        u16::from_le_bytes(self.array(range))
    }

    pub(crate) fn u32_be(&self, range: Range<usize>) -> u32 {
        u32::from_be_bytes(self.array(range))
    }

    pub(crate) fn array<const N: usize>(&self, range: Range<usize>) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(src) = self.bytes.get(range) {
            if src.len() == N {
                out.copy_from_slice(src);
            }
        }
        out
    }

    /// Bytes from `offset` to the end, empty when `offset` is past the end.
    pub(crate) fn tail(&self, offset: usize) -> &'a [u8] {
        self.bytes.get(offset..).unwrap_or(&[])
    }

    /// Bytes in `range`, or `None` when the range is not fully present.
    pub(crate) fn slice(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.bytes.get(range)
    }
}

#[cfg(test)]
mod tests {
    use super::FieldReader;

    #[test]
    fn with_len_rejects_short_input() {
        assert!(FieldReader::with_len(&[1, 2, 3], 4).is_none());
        assert!(FieldReader::with_len(&[1, 2, 3, 4], 4).is_some());
    }

    #[test]
    fn reads_both_byte_orders() {
        let reader = FieldReader::with_len(&[0x12, 0x34, 0x56, 0x78], 4).unwrap();
        assert_eq!(reader.u16_be(0..2), 0x1234);
        assert_eq!(reader.u16_le(0..2), 0x3412);
        assert_eq!(reader.u32_be(0..4), 0x1234_5678);
    }

    #[test]
    fn out_of_range_reads_are_zero() {
        let reader = FieldReader::with_len(&[0xff], 1).unwrap();
        assert_eq!(reader.u8_at(3), 0);
        assert_eq!(reader.u16_be(1..3), 0);
        assert!(reader.tail(5).is_empty());
        assert!(reader.slice(0..2).is_none());
    }
}
