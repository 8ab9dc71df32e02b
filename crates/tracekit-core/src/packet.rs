//! Packet buffers and per-packet metadata.
//!
//! A [`Packet`] holds one record: a format-specific framing header followed
//! by the captured link-layer bytes. The buffer is either owned by the packet
//! (and reused across reads) or an external, reference-counted slice of
//! memory owned by the provider, such as a memory-mapped trace file.
//!
//! Invariants:
//! - `framing_length() + capture_length() <= buffer_size()`.
//! - `capture_length() <= wire_length()`.
//! - A read either replaces the packet contents entirely or leaves them as
//!   they were.

use std::time::Duration;

use bytes::Bytes;

use crate::error::TraceError;
use crate::format::{Direction, PacketFormat};
use crate::linktype::LinkType;
use crate::timestamp::Timestamp;

/// Who owns a packet's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOwnership {
    /// The packet allocated the buffer and frees it on drop.
    Packet,
    /// The buffer belongs to the provider; the packet holds a reference.
    External,
}

#[derive(Debug)]
pub enum PacketBuffer {
    Owned(Vec<u8>),
    External(Bytes),
}

impl PacketBuffer {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            PacketBuffer::Owned(buf) => buf,
            PacketBuffer::External(buf) => buf,
        }
    }

    pub fn ownership(&self) -> BufferOwnership {
        match self {
            PacketBuffer::Owned(_) => BufferOwnership::Packet,
            PacketBuffer::External(_) => BufferOwnership::External,
        }
    }
}

/// A single captured packet and its framing header.
#[derive(Debug)]
pub struct Packet {
    format: Option<PacketFormat>,
    buffer: PacketBuffer,
    header_len: usize,
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet {
    /// An empty packet, ready to be filled by a read.
    pub fn new() -> Self {
        Self {
            format: None,
            buffer: PacketBuffer::Owned(Vec::new()),
            header_len: 0,
        }
    }

    /// Fill the packet with a copy of `header` followed by `data`, reusing
    /// the owned allocation when there is one.
    pub(crate) fn load_owned(&mut self, format: PacketFormat, header: &[u8], data: &[u8]) {
        if let PacketBuffer::External(_) = self.buffer {
            self.buffer = PacketBuffer::Owned(Vec::with_capacity(header.len() + data.len()));
        }
        if let PacketBuffer::Owned(buf) = &mut self.buffer {
            buf.clear();
            buf.extend_from_slice(header);
            buf.extend_from_slice(data);
        }
        self.format = Some(format);
        self.header_len = header.len();
    }

    /// Point the packet at an externally owned record without copying it.
    pub(crate) fn load_external(&mut self, format: PacketFormat, record: Bytes, header_len: usize) {
        self.header_len = header_len.min(record.len());
        self.buffer = PacketBuffer::External(record);
        self.format = Some(format);
    }

    /// Forget the contents. The owned allocation is kept for reuse.
    pub fn clear(&mut self) {
        match &mut self.buffer {
            PacketBuffer::Owned(buf) => buf.clear(),
            PacketBuffer::External(_) => self.buffer = PacketBuffer::Owned(Vec::new()),
        }
        self.format = None;
        self.header_len = 0;
    }

    /// Deep copy with an owned buffer, regardless of this packet's ownership.
    pub fn copy(&self) -> Packet {
        Packet {
            format: self.format,
            buffer: PacketBuffer::Owned(self.buffer.as_slice().to_vec()),
            header_len: self.header_len,
        }
    }

    pub fn format(&self) -> Option<PacketFormat> {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.format.is_none()
    }

    pub fn ownership(&self) -> BufferOwnership {
        self.buffer.ownership()
    }

    /// True when the bytes live in provider memory rather than a copy.
    pub fn is_zero_copy(&self) -> bool {
        self.ownership() == BufferOwnership::External
    }

    /// The whole record: framing header, captured bytes and any padding.
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.as_slice().len()
    }

    pub fn framing_header(&self) -> &[u8] {
        &self.buffer.as_slice()[..self.header_len]
    }

    pub fn framing_length(&self) -> usize {
        self.header_len
    }

    /// Offset of the first link-layer byte within [`Packet::buffer`].
    pub fn payload_offset(&self) -> usize {
        self.header_len
    }

    pub fn wire_length(&self) -> usize {
        match self.format {
            Some(format) => format.wire_length(self.framing_header()),
            None => 0,
        }
    }

    /// Captured link-layer bytes, never more than are in the buffer or were
    /// on the wire.
    pub fn capture_length(&self) -> usize {
        let Some(format) = self.format else {
            return 0;
        };
        let header = self.framing_header();
        format
            .capture_length(header)
            .min(self.buffer_size() - self.header_len)
            .min(format.wire_length(header))
    }

    /// The captured link-layer bytes.
    pub fn link(&self) -> &[u8] {
        let start = self.header_len;
        &self.buffer.as_slice()[start..start + self.capture_length()]
    }

    pub fn link_type(&self) -> Option<LinkType> {
        self.format?.link_type(self.framing_header())
    }

    pub fn timestamp(&self) -> Timestamp {
        match self.format {
            Some(format) => format.timestamp(self.framing_header()),
            None => Timestamp::default(),
        }
    }

    /// Timestamp as the 64-bit ERF fixed-point value.
    pub fn erf_timestamp(&self) -> u64 {
        self.timestamp().erf()
    }

    /// Timestamp as a duration since the Unix epoch.
    pub fn timeval(&self) -> Duration {
        self.timestamp().as_duration()
    }

    pub fn seconds(&self) -> f64 {
        self.timestamp().seconds()
    }

    /// Direction or interface, when the format records one.
    pub fn direction(&self) -> Option<Direction> {
        self.format?.direction(self.framing_header())
    }

    /// # Errors
    /// `Unsupported` when the format has nowhere to store this direction.
    /// The packet is left untouched.
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), TraceError> {
        let Some(format) = self.format else {
            return Err(TraceError::Unsupported("direction of an empty packet".into()));
        };
        let mut header = self.framing_header().to_vec();
        format.set_direction(&mut header, direction)?;
        self.make_owned();
        if let PacketBuffer::Owned(buf) = &mut self.buffer {
            buf[..header.len()].copy_from_slice(&header);
        }
        Ok(())
    }

    /// Truncate the captured bytes to at most `len`; never grows a packet.
    /// Returns the resulting capture length.
    pub fn set_capture_length(&mut self, len: usize) -> usize {
        let current = self.capture_length();
        let Some(format) = self.format else {
            return 0;
        };
        if len >= current {
            return current;
        }
        let header_len = self.header_len;
        self.make_owned();
        if let PacketBuffer::Owned(buf) = &mut self.buffer {
            format.set_capture_length(&mut buf[..header_len], len);
            buf.truncate(header_len + len);
        }
        len
    }

    /// Replace an external buffer with a private copy before mutation.
    fn make_owned(&mut self) {
        if let PacketBuffer::External(bytes) = &self.buffer {
            self.buffer = PacketBuffer::Owned(bytes.to_vec());
        }
    }
}
