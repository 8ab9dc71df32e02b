use std::io::Read;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};

use crate::config::{InputConfig, TraceOption};
use crate::error::TraceError;
use crate::event::TraceEvent;
use crate::format::replay::{RecordSource, Replay};
use crate::format::{InputFormat, PacketFormat, clamp_u32, io};
use crate::packet::Packet;
use crate::timestamp::Timestamp;

use super::error::PcapFormatError;
use super::layout;
use super::reader::{
    Interface, MagicStream, interface_for_id, is_nanosecond_magic, is_pcapng_magic,
    pcapng_timestamp, read_magic,
};

type Stream = MagicStream<Box<dyn Read + Send>>;

/// Replays a legacy pcap or pcapng file, plain or gzip-compressed.
pub struct PcapInput {
    source: PcapSource,
    replay: Replay,
}

struct PcapSource {
    location: String,
    reader: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<Stream>,
        linktype: Linktype,
        nanos: bool,
    },
    Ng {
        reader: PcapNGReader<Stream>,
        interfaces: Vec<Interface>,
    },
}

impl PcapInput {
    /// # Errors
    /// `InitFailed` when the location cannot be opened or is not a pcap
    /// or pcapng stream.
    pub fn open(location: &str) -> Result<Self, TraceError> {
        let reader = create_reader(location).map_err(|e| TraceError::init(location, e))?;
        tracing::debug!(location, "pcap input opened");
        Ok(Self {
            source: PcapSource {
                location: location.to_string(),
                reader,
            },
            replay: Replay::default(),
        })
    }
}

pub(crate) fn open_input(location: &str) -> Result<Box<dyn InputFormat>, TraceError> {
    Ok(Box::new(PcapInput::open(location)?))
}

impl InputFormat for PcapInput {
    fn config(&mut self, option: &TraceOption) -> Result<(), TraceError> {
        match option {
            TraceOption::Snaplen(_) | TraceOption::Filter(_) => Ok(()),
            TraceOption::Promisc(_) => Err(TraceError::OptionUnavailable(format!(
                "{} on a pcap file",
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

impl RecordSource for PcapSource {
    fn next_record(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        let size = next_record(&mut self.reader, packet)
            .map_err(|e| TraceError::bad_packet(&self.location, e))?;
        if size > 0 {
            tracing::trace!(size, caplen = packet.capture_length(), "pcap record");
        }
        Ok(size)
    }

    fn rewind(&mut self) -> Result<(), TraceError> {
        if self.location == io::STDIO_LOCATION {
            return Err(TraceError::Unsupported("rewinding standard input".into()));
        }
        self.reader =
            create_reader(&self.location).map_err(|e| TraceError::init(&self.location, e))?;
        Ok(())
    }
}

fn create_reader(location: &str) -> Result<PcapReader, PcapFormatError> {
    let stream = io::open_input(location)?;
    let (magic, stream) = read_magic(stream)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, stream).map_err(|e| {
            PcapFormatError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            interfaces: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, stream).map_err(|e| {
            PcapFormatError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: Linktype::ETHERNET,
            nanos: false,
        })
    }
}

/// Load the next packet record, skipping non-packet blocks. Returns the
/// size of the consumed block, or 0 at the end of the file.
fn next_record(reader: &mut PcapReader, packet: &mut Packet) -> Result<usize, PcapFormatError> {
    loop {
        match reader {
            PcapReader::Legacy {
                reader,
                linktype,
                nanos,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let loaded = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = header.network;
                            *nanos = is_nanosecond_magic(header.magic_number);
                            false
                        }
                        PcapBlockOwned::Legacy(record) => {
                            let ts = if *nanos {
                                Timestamp::from_parts(record.ts_sec, record.ts_usec)
                            } else {
                                Timestamp::from_timeval(record.ts_sec, record.ts_usec)
                            };
                            let data = captured(record.data, record.caplen);
                            let header =
                                layout::record_header(ts, clamp_u32(data.len()), record.origlen);
                            packet.load_owned(PacketFormat::Pcap(*linktype), &header, data);
                            true
                        }
                        _ => false,
                    };
                    reader.consume(offset);
                    if loaded {
                        return Ok(offset);
                    }
                }
                Err(PcapError::Eof) => return Ok(0),
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapFormatError::Pcap {
                        context: "pcap reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapFormatError::Pcap {
                        context: "pcap reader next",
                        message: e.to_string(),
                    });
                }
            },
            PcapReader::Ng { reader, interfaces } => match reader.next() {
                Ok((offset, block)) => {
                    let loaded = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            interfaces.clear();
                            false
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            interfaces.push(Interface {
                                linktype: intf.linktype,
                                tsresol: intf.if_tsresol,
                            });
                            false
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                            let intf = interface_for_id(interfaces, epb.if_id);
                            let ts = pcapng_timestamp(epb.ts_high, epb.ts_low, intf.tsresol);
                            let data = captured(epb.data, epb.caplen);
                            let header =
                                layout::record_header(ts, clamp_u32(data.len()), epb.origlen);
                            packet.load_owned(PacketFormat::Pcap(intf.linktype), &header, data);
                            true
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                            let intf = interface_for_id(interfaces, 0);
                            let data = captured(spb.data, spb.origlen);
                            let header = layout::record_header(
                                Timestamp::default(),
                                clamp_u32(data.len()),
                                spb.origlen,
                            );
                            packet.load_owned(PacketFormat::Pcap(intf.linktype), &header, data);
                            true
                        }
                        _ => false,
                    };
                    reader.consume(offset);
                    if loaded {
                        return Ok(offset);
                    }
                }
                Err(PcapError::Eof) => return Ok(0),
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapFormatError::Pcap {
                        context: "pcapng reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapFormatError::Pcap {
                        context: "pcapng reader next",
                        message: e.to_string(),
                    });
                }
            },
        }
    }
}

/// Packet bytes without block padding.
fn captured(data: &[u8], caplen: u32) -> &[u8] {
    &data[..(caplen as usize).min(data.len())]
}
