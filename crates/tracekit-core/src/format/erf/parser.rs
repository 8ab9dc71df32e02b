use std::fs::File;
use std::io::Read;

use bytes::Bytes;
use memmap2::Mmap;

use crate::config::{InputConfig, TraceOption};
use crate::error::TraceError;
use crate::event::TraceEvent;
use crate::format::replay::{RecordSource, Replay};
use crate::format::{InputFormat, PacketFormat, io};
use crate::packet::Packet;
use crate::timestamp::Timestamp;

use super::error::ErfFormatError;
use super::layout;

/// Replays an ERF file.
///
/// Plain files are memory-mapped and every packet is a zero-copy slice of
/// the mapping; compressed files and stdin are streamed into the packet's
/// own buffer.
pub struct ErfInput {
    source: ErfSource,
    replay: Replay,
}

struct ErfSource {
    location: String,
    reader: ErfReader,
}

enum ErfReader {
    Mapped { map: Bytes, offset: usize },
    Stream { reader: Box<dyn Read + Send>, scratch: Vec<u8> },
}

impl ErfInput {
    /// # Errors
    /// `InitFailed` when the location cannot be opened or mapped.
    pub fn open(location: &str) -> Result<Self, TraceError> {
        let reader = create_reader(location).map_err(|e| TraceError::init(location, e))?;
        tracing::debug!(
            location,
            mapped = matches!(reader, ErfReader::Mapped { .. }),
            "erf input opened"
        );
        Ok(Self {
            source: ErfSource {
                location: location.to_string(),
                reader,
            },
            replay: Replay::default(),
        })
    }
}

pub(crate) fn open_input(location: &str) -> Result<Box<dyn InputFormat>, TraceError> {
    Ok(Box::new(ErfInput::open(location)?))
}

fn create_reader(location: &str) -> Result<ErfReader, ErfFormatError> {
    if location != io::STDIO_LOCATION {
        let mut file = File::open(location)?;
        let mut magic = [0u8; 2];
        let sniffed = io::read_full(&mut file, &mut magic)?;
        if !io::is_gzip(&magic[..sniffed]) {
            let len = file.metadata()?.len();
            let map = if len == 0 {
                Bytes::new()
            } else {
                // The mapping is read-only and lives as long as any packet
                // still referencing it.
                let mmap = unsafe { Mmap::map(&file)? };
                Bytes::from_owner(mmap)
            };
            return Ok(ErfReader::Mapped { map, offset: 0 });
        }
    }
    Ok(ErfReader::Stream {
        reader: io::open_input(location)?,
        scratch: Vec::new(),
    })
}

impl InputFormat for ErfInput {
    fn config(&mut self, option: &TraceOption) -> Result<(), TraceError> {
        match option {
            TraceOption::Snaplen(_) | TraceOption::Filter(_) => Ok(()),
            TraceOption::Promisc(_) => Err(TraceError::OptionUnavailable(format!(
                "{} on an erf file",
                option.name()
            ))),
        }
    }

    fn start(&mut self, _config: &InputConfig) -> Result<(), TraceError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), TraceError> {
        self.replay.pause();
        Ok(())
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        self.replay.read(&mut self.source, packet)
    }

    fn event(&mut self, packet: &mut Packet) -> Result<TraceEvent, TraceError> {
        self.replay.event(&mut self.source, packet)
    }

    fn seek(&mut self, target: Timestamp) -> Result<(), TraceError> {
        self.replay.seek(&mut self.source, target)
    }
}

impl RecordSource for ErfSource {
    fn next_record(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        loop {
            let record = self
                .reader
                .next_record(packet)
                .map_err(|e| TraceError::bad_packet(&self.location, e))?;
            match record {
                Record::End => return Ok(0),
                Record::Loaded(size) => {
                    tracing::trace!(size, caplen = packet.capture_length(), "erf record");
                    return Ok(size);
                }
                Record::Skipped(erf_type) => {
                    tracing::warn!(
                        location = %self.location,
                        erf_type,
                        "skipping erf record with extension headers"
                    );
                }
            }
        }
    }

    fn rewind(&mut self) -> Result<(), TraceError> {
        if let ErfReader::Mapped { offset, .. } = &mut self.reader {
            *offset = 0;
            return Ok(());
        }
        if self.location == io::STDIO_LOCATION {
            return Err(TraceError::Unsupported("rewinding standard input".into()));
        }
        self.reader =
            create_reader(&self.location).map_err(|e| TraceError::init(&self.location, e))?;
        Ok(())
    }
}

enum Record {
    End,
    Loaded(usize),
    /// Consumed but not delivered; carries the raw type byte.
    Skipped(u8),
}

/// Validate a record header and return its total length and framing.
fn record_bounds(header: &[u8], available: usize) -> Result<(usize, usize), ErfFormatError> {
    let rlen = layout::record_len(header);
    let framing = layout::framing_len(header[layout::TYPE_OFFSET]);
    if rlen < framing {
        return Err(ErfFormatError::ShortRecord { rlen, framing });
    }
    if rlen > available {
        return Err(ErfFormatError::Truncated {
            needed: rlen,
            available,
        });
    }
    Ok((rlen, framing))
}

fn has_extensions(header: &[u8]) -> bool {
    header[layout::TYPE_OFFSET] & layout::TYPE_EXTENSION_BIT != 0
}

impl ErfReader {
    fn next_record(&mut self, packet: &mut Packet) -> Result<Record, ErfFormatError> {
        match self {
            ErfReader::Mapped { map, offset } => {
                let available = map.len() - *offset;
                if available == 0 {
                    return Ok(Record::End);
                }
                if available < layout::RECORD_HEADER_LEN {
                    return Err(ErfFormatError::Truncated {
                        needed: layout::RECORD_HEADER_LEN,
                        available,
                    });
                }
                let header = &map[*offset..*offset + layout::RECORD_HEADER_LEN];
                let (rlen, framing) = record_bounds(header, available)?;
                let skipped = has_extensions(header).then(|| header[layout::TYPE_OFFSET]);
                let start = *offset;
                *offset += rlen;
                if let Some(erf_type) = skipped {
                    return Ok(Record::Skipped(erf_type));
                }
                packet.load_external(PacketFormat::Erf, map.slice(start..start + rlen), framing);
                Ok(Record::Loaded(rlen))
            }
            ErfReader::Stream { reader, scratch } => {
                scratch.resize(layout::RECORD_HEADER_LEN, 0);
                let got = io::read_full(reader, scratch)?;
                if got == 0 {
                    return Ok(Record::End);
                }
                if got < layout::RECORD_HEADER_LEN {
                    return Err(ErfFormatError::Truncated {
                        needed: layout::RECORD_HEADER_LEN,
                        available: got,
                    });
                }
                let (rlen, framing) = record_bounds(scratch, usize::from(u16::MAX))?;
                scratch.resize(rlen, 0);
                let body = io::read_full(reader, &mut scratch[layout::RECORD_HEADER_LEN..])?;
                if body < rlen - layout::RECORD_HEADER_LEN {
                    return Err(ErfFormatError::Truncated {
                        needed: rlen,
                        available: layout::RECORD_HEADER_LEN + body,
                    });
                }
                if has_extensions(scratch) {
                    return Ok(Record::Skipped(scratch[layout::TYPE_OFFSET]));
                }
                packet.load_owned(PacketFormat::Erf, &scratch[..framing], &scratch[framing..]);
                Ok(Record::Loaded(rlen))
            }
        }
    }
}
