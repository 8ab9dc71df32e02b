use std::io::Write;

use pcap_parser::Linktype;

use crate::config::{OutputConfig, OutputOption, check_compression};
use crate::error::TraceError;
use crate::format::io::{self, OutputStream, check_output_location};
use crate::format::{OutputFormat, PacketFormat, clamp_u32};
use crate::packet::Packet;

use super::error::PcapFormatError;
use super::layout;

/// Writes legacy pcap files with microsecond timestamps.
///
/// The file's link type is fixed by the first packet written, or by the
/// global header of a file being appended to. Appended records keep that
/// file's timestamp resolution.
pub struct PcapOutput {
    location: String,
    stream: Option<OutputStream>,
    linktype: Option<Linktype>,
    nanos: bool,
    /// The file already holds a global header (append mode).
    header_written: bool,
}

impl PcapOutput {
    /// # Errors
    /// `InitFailed` when the destination directory does not exist.
    pub fn create(location: &str) -> Result<Self, TraceError> {
        check_output_location(location).map_err(|e| TraceError::init(location, e))?;
        Ok(Self {
            location: location.to_string(),
            stream: None,
            linktype: None,
            nanos: false,
            header_written: false,
        })
    }
}

pub(crate) fn open_output(location: &str) -> Result<Box<dyn OutputFormat>, TraceError> {
    Ok(Box::new(PcapOutput::create(location)?))
}

/// Link type and resolution of the pcap file being appended to.
fn existing_header(location: &str) -> Result<(Linktype, bool), PcapFormatError> {
    let mut header = [0u8; layout::FILE_HEADER_LEN];
    let read = io::read_full(&mut io::open_input(location)?, &mut header)?;
    if read < header.len() {
        return Err(PcapFormatError::Pcap {
            context: "append",
            message: format!("global header truncated after {read} bytes"),
        });
    }
    layout::parse_file_header(&header).ok_or_else(|| PcapFormatError::Pcap {
        context: "append",
        message: "not a little-endian legacy pcap file".to_string(),
    })
}

/// The pcap DLT a packet would be written with.
fn dlt_for(packet: &Packet) -> Result<Linktype, TraceError> {
    match packet.format() {
        Some(PacketFormat::Pcap(dlt)) => Ok(dlt),
        Some(format) => packet.link_type().and_then(|link| link.to_dlt()).ok_or_else(|| {
            TraceError::NoConversion(format!(
                "{} packet with link type {} has no pcap equivalent",
                format.name(),
                packet.link_type().map_or("unknown", |link| link.name())
            ))
        }),
        None => Err(TraceError::BadPacket("cannot write an empty packet".into())),
    }
}

impl OutputFormat for PcapOutput {
    fn config(&mut self, option: &OutputOption) -> Result<(), TraceError> {
        match option {
            OutputOption::FileFlags(_) => Ok(()),
            OutputOption::Compress(level) => check_compression(*level),
        }
    }

    fn start(&mut self, config: &OutputConfig) -> Result<(), TraceError> {
        let (stream, has_data) = OutputStream::open(&self.location, config.flags, config.compress)
            .map_err(|e| TraceError::init(&self.location, e))?;
        if has_data {
            let (linktype, nanos) =
                existing_header(&self.location).map_err(|e| TraceError::init(&self.location, e))?;
            tracing::debug!(
                location = %self.location,
                linktype = linktype.0,
                nanos,
                "appending to pcap file"
            );
            self.linktype = Some(linktype);
            self.nanos = nanos;
        }
        self.header_written = has_data;
        self.stream = Some(stream);
        tracing::debug!(location = %self.location, append = has_data, "pcap output opened");
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<usize, TraceError> {
        let dlt = dlt_for(packet)?;
        match self.linktype {
            Some(current) if current != dlt => {
                return Err(TraceError::NoConversion(format!(
                    "link type {} in a pcap file of link type {}",
                    dlt.0, current.0
                )));
            }
            _ => {}
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(TraceError::Unsupported("writing before start".into()));
        };
        let failed = |e: std::io::Error| TraceError::bad_packet("pcap write", e);

        if !self.header_written {
            stream.write_all(&layout::file_header(dlt)).map_err(failed)?;
            self.header_written = true;
        }
        self.linktype = Some(dlt);

        let data = packet.link();
        let header = layout::file_record_header(
            packet.timestamp(),
            clamp_u32(data.len()),
            clamp_u32(packet.wire_length()),
            self.nanos,
        );
        stream.write_all(&header).map_err(failed)?;
        stream.write_all(data).map_err(failed)?;
        Ok(header.len() + data.len())
    }

    fn fin(&mut self) -> Result<(), TraceError> {
        match self.stream.take() {
            Some(stream) => stream.finish().map_err(|e| TraceError::init(&self.location, e)),
            None => Ok(()),
        }
    }
}
