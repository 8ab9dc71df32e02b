use std::io::Write;

use crate::config::{OutputConfig, OutputOption, check_compression};
use crate::error::TraceError;
use crate::format::io::{OutputStream, check_output_location};
use crate::format::{OutputFormat, PacketFormat};
use crate::packet::Packet;

use super::layout;

/// Writes ERF records. ERF packets keep their header; Ethernet, POS and
/// ATM packets from other formats get a fresh one.
pub struct ErfOutput {
    location: String,
    stream: Option<OutputStream>,
}

impl ErfOutput {
    /// # Errors
    /// `InitFailed` when the destination directory does not exist.
    pub fn create(location: &str) -> Result<Self, TraceError> {
        check_output_location(location).map_err(|e| TraceError::init(location, e))?;
        Ok(Self {
            location: location.to_string(),
            stream: None,
        })
    }
}

pub(crate) fn open_output(location: &str) -> Result<Box<dyn OutputFormat>, TraceError> {
    Ok(Box::new(ErfOutput::create(location)?))
}

/// Framing for `packet` as an ERF record carrying `caplen` bytes.
fn erf_header(packet: &Packet, caplen: usize) -> Result<Vec<u8>, TraceError> {
    let Some(format) = packet.format() else {
        return Err(TraceError::BadPacket("cannot write an empty packet".into()));
    };
    let mut header = match format {
        PacketFormat::Erf => packet.framing_header().to_vec(),
        _ => {
            let erf_type = packet
                .link_type()
                .and_then(|link| link.to_erf_type())
                .ok_or_else(|| {
                    TraceError::NoConversion(format!(
                        "{} packet with link type {} has no erf record type",
                        format.name(),
                        packet.link_type().map_or("unknown", |link| link.name())
                    ))
                })?;
            layout::record_header(
                packet.timestamp(),
                erf_type,
                packet.direction(),
                caplen,
                packet.wire_length(),
            )
        }
    };
    if header.len() + caplen > layout::MAX_RECORD_LEN {
        return Err(TraceError::NoConversion(format!(
            "{}-byte packet does not fit an erf record",
            caplen
        )));
    }
    // the stored rlen may include padding that is not written back
    layout::set_capture_len(&mut header, caplen);
    Ok(header)
}

impl OutputFormat for ErfOutput {
    fn config(&mut self, option: &OutputOption) -> Result<(), TraceError> {
        match option {
            OutputOption::FileFlags(_) => Ok(()),
            OutputOption::Compress(level) => check_compression(*level),
        }
    }

    fn start(&mut self, config: &OutputConfig) -> Result<(), TraceError> {
        let (stream, _) = OutputStream::open(&self.location, config.flags, config.compress)
            .map_err(|e| TraceError::init(&self.location, e))?;
        self.stream = Some(stream);
        tracing::debug!(location = %self.location, "erf output opened");
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<usize, TraceError> {
        let data = packet.link();
        let header = erf_header(packet, data.len())?;
        let Some(stream) = self.stream.as_mut() else {
            return Err(TraceError::Unsupported("writing before start".into()));
        };
        let failed = |e: std::io::Error| TraceError::bad_packet("erf write", e);
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

#[cfg(test)]
mod tests {
    use pcap_parser::Linktype;

    use super::ErfOutput;
    use crate::config::OutputConfig;
    use crate::error::ErrorKind;
    use crate::format::erf::{ErfInput, layout};
    use crate::format::{InputFormat, OutputFormat, PacketFormat, pcap};
    use crate::linktype::LinkType;
    use crate::packet::Packet;
    use crate::timestamp::Timestamp;

    fn pcap_packet(dlt: i32, len: usize) -> Packet {
        let mut packet = Packet::new();
        let header =
            pcap::layout::record_header(Timestamp::from_parts(9, 500), len as u32, len as u32);
        packet.load_owned(PacketFormat::Pcap(Linktype(dlt)), &header, &vec![0x42; len]);
        packet
    }

    #[test]
    fn converts_ethernet_pcap_packets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.erf");
        let location = path.to_str().unwrap();

        let mut output = ErfOutput::create(location).unwrap();
        output.start(&OutputConfig::default()).unwrap();
        let written = output.write_packet(&pcap_packet(1, 60)).unwrap();
        assert_eq!(written, layout::ETH_FRAMING_LEN + 60);
        output.fin().unwrap();

        let mut input = ErfInput::open(location).unwrap();
        let mut packet = Packet::new();
        input.read_packet(&mut packet).unwrap();
        assert_eq!(packet.link_type(), Some(LinkType::Ethernet));
        assert_eq!(packet.timestamp(), Timestamp::from_parts(9, 500));
        assert_eq!(packet.link(), &[0x42; 60]);
    }

    #[test]
    fn wireless_packets_have_no_erf_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = ErfOutput::create(dir.path().join("o.erf").to_str().unwrap()).unwrap();
        output.start(&OutputConfig::default()).unwrap();
        let err = output.write_packet(&pcap_packet(105, 24)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConversion);
    }

    #[test]
    fn oversized_packets_do_not_fit() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = ErfOutput::create(dir.path().join("o.erf").to_str().unwrap()).unwrap();
        output.start(&OutputConfig::default()).unwrap();
        let err = output.write_packet(&pcap_packet(1, 70_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConversion);
    }
}
