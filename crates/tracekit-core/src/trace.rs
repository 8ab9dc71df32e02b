//! Trace handles: the lifecycle around one input or output provider.
//!
//! A [`Trace`] moves through `Config → Running ⇄ Paused`. Options are
//! accepted while configuring or paused, packets only flow while running,
//! and every failure is both returned and kept in the handle's sticky
//! [`ErrorState`]. Dropping a handle (or calling `destroy`) releases the
//! provider exactly once.

use std::io::{self, Write};
use std::time::Duration;

use crate::config::{InputConfig, OutputConfig, OutputOption, TraceOption};
use crate::error::{ErrorState, TraceError};
use crate::event::TraceEvent;
use crate::format::{
    self, FormatEntry, InputFormat, OutputFormat, PacketFormat, Registry, erf, int, pcap,
};
use crate::linktype::LinkType;
use crate::packet::Packet;
use crate::timestamp::Timestamp;
use crate::uri::{TraceUri, parse_uri};

/// Lifecycle state of a trace handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    Config,
    Running,
    Paused,
}

/// A point in time to seek to, in any of the supported clock formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// ERF 32.32 fixed point.
    Erf(u64),
    /// Time since the epoch.
    Timeval(Duration),
    /// Floating seconds since the epoch.
    Seconds(f64),
}

impl SeekTarget {
    pub fn timestamp(self) -> Timestamp {
        match self {
            SeekTarget::Erf(raw) => Timestamp::from_erf(raw),
            SeekTarget::Timeval(since_epoch) => Timestamp::from_duration(since_epoch),
            SeekTarget::Seconds(seconds) => Timestamp::from_seconds(seconds),
        }
    }
}

fn resolve<'r>(
    registry: &'r Registry,
    uri: &str,
) -> Result<(TraceUri, &'r FormatEntry), TraceError> {
    let uri = parse_uri(uri)?;
    let entry = registry
        .lookup(&uri.format)
        .ok_or_else(|| TraceError::BadFormat(format!("unknown format '{}'", uri.format)))?;
    Ok((uri, entry))
}

fn wrong_state(action: &str, state: TraceState) -> TraceError {
    TraceError::Unsupported(format!("{action} while {state:?}").to_lowercase())
}

/// An input trace.
///
/// # Examples
/// ```no_run
/// use tracekit_core::{Packet, Trace, TraceOption};
///
/// let mut trace = Trace::create("pcapfile:capture.pcap")?;
/// trace.config(TraceOption::Snaplen(96))?;
/// trace.start()?;
/// let mut packet = Packet::new();
/// while trace.read_packet(&mut packet)? > 0 {
///     println!("{} bytes at {:.6}", packet.capture_length(), packet.seconds());
/// }
/// trace.destroy();
/// # Ok::<(), tracekit_core::TraceError>(())
/// ```
pub struct Trace {
    uri: TraceUri,
    format: &'static str,
    input: Box<dyn InputFormat>,
    state: TraceState,
    config: InputConfig,
    errors: ErrorState,
    finished: bool,
}

impl std::fmt::Debug for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trace")
            .field("uri", &self.uri)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Trace {
    /// Open an input trace from a `format:location` URI using the built-in
    /// providers.
    ///
    /// # Errors
    /// `BadFormat` for a malformed URI, an unknown format or a format that
    /// cannot be read; `InitFailed` when the provider cannot open the
    /// location.
    pub fn create(uri: &str) -> Result<Self, TraceError> {
        Self::create_with(format::builtin(), uri)
    }

    /// Like [`Trace::create`], resolving the format in `registry`.
    pub fn create_with(registry: &Registry, uri: &str) -> Result<Self, TraceError> {
        let (uri, entry) = resolve(registry, uri)?;
        let open = entry
            .input
            .ok_or_else(|| TraceError::BadFormat(format!("format '{}' cannot be read", entry.name)))?;
        let input = open(&uri.location)?;
        tracing::debug!(format = entry.name, location = %uri.location, "trace created");
        Ok(Self {
            uri,
            format: entry.name,
            input,
            state: TraceState::Config,
            config: InputConfig::default(),
            errors: ErrorState::default(),
            finished: false,
        })
    }

    pub fn uri(&self) -> &TraceUri {
        &self.uri
    }

    /// Registered name of the provider, aliases resolved.
    pub fn format_name(&self) -> &'static str {
        self.format
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    /// Options accepted so far.
    pub fn input_config(&self) -> &InputConfig {
        &self.config
    }

    /// Stage an option. Allowed while configuring or paused.
    ///
    /// # Errors
    /// `Unsupported` while running, `OptionUnavailable` when the provider
    /// cannot honour the option.
    pub fn config(&mut self, option: TraceOption) -> Result<(), TraceError> {
        let result = self.try_config(option);
        self.errors.record(result)
    }

    fn try_config(&mut self, option: TraceOption) -> Result<(), TraceError> {
        if self.state == TraceState::Running {
            return Err(wrong_state("configuring", self.state));
        }
        self.input.config(&option)?;
        tracing::debug!(option = option.name(), "trace option accepted");
        self.config.apply(option);
        Ok(())
    }

    /// Stage a textual `key=value` option.
    ///
    /// # Errors
    /// As [`TraceOption::parse`] and [`Trace::config`].
    pub fn config_str(&mut self, text: &str) -> Result<(), TraceError> {
        let result = TraceOption::parse(text).and_then(|option| self.try_config(option));
        self.errors.record(result)
    }

    /// Begin or resume delivery.
    ///
    /// # Errors
    /// `Unsupported` when already running; provider failures otherwise.
    pub fn start(&mut self) -> Result<(), TraceError> {
        let result = match self.state {
            TraceState::Running => Err(wrong_state("starting", self.state)),
            _ => self.input.start(&self.config),
        };
        if result.is_ok() {
            tracing::debug!(from = ?self.state, "trace running");
            self.state = TraceState::Running;
        }
        self.errors.record(result)
    }

    /// Stop delivery; the trace can be reconfigured and started again.
    ///
    /// # Errors
    /// `Unsupported` unless running.
    pub fn pause(&mut self) -> Result<(), TraceError> {
        let result = match self.state {
            TraceState::Running => self.input.pause(),
            _ => Err(wrong_state("pausing", self.state)),
        };
        if result.is_ok() {
            tracing::debug!("trace paused");
            self.state = TraceState::Paused;
        }
        self.errors.record(result)
    }

    /// Read the next packet that passes the filter, blocking if needed.
    ///
    /// Returns the bytes consumed from the source, or `0` at the end of
    /// the trace.
    ///
    /// # Errors
    /// `Unsupported` unless running; `BadFormat` when the filter does not
    /// compile; provider failures otherwise.
    pub fn read_packet(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        let result = self.read_admitted(packet);
        self.errors.record(result)
    }

    fn read_admitted(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        if self.state != TraceState::Running {
            return Err(wrong_state("reading", self.state));
        }
        loop {
            let size = self.input.read_packet(packet)?;
            if size == 0 || self.admit(packet)? {
                return Ok(size);
            }
        }
    }

    /// Apply the filter and snaplen to a freshly read packet.
    fn admit(&mut self, packet: &mut Packet) -> Result<bool, TraceError> {
        if let Some(filter) = &mut self.config.filter {
            if !filter.matches(packet)? {
                return Ok(false);
            }
        }
        if let Some(snaplen) = self.config.snaplen {
            packet.set_capture_length(snaplen as usize);
        }
        Ok(true)
    }

    /// One non-blocking step. Failures, including a filter that does not
    /// compile, end in [`TraceEvent::Terminate`] with the error kept in the
    /// handle.
    pub fn event(&mut self, packet: &mut Packet) -> TraceEvent {
        match self.try_event(packet) {
            Ok(event) => event,
            Err(err) => {
                self.errors.set(err);
                TraceEvent::Terminate
            }
        }
    }

    fn try_event(&mut self, packet: &mut Packet) -> Result<TraceEvent, TraceError> {
        if self.state != TraceState::Running {
            return Err(wrong_state("stepping", self.state));
        }
        loop {
            match self.input.event(packet)? {
                TraceEvent::Packet(0) => return Ok(TraceEvent::Terminate),
                TraceEvent::Packet(size) => {
                    if self.admit(packet)? {
                        return Ok(TraceEvent::Packet(size));
                    }
                }
                other => return Ok(other),
            }
        }
    }

    /// Position the trace so the next read returns the first packet at or
    /// after `target`.
    ///
    /// # Errors
    /// `Unsupported` while running or when the provider cannot seek.
    pub fn seek(&mut self, target: SeekTarget) -> Result<(), TraceError> {
        let result = match self.state {
            TraceState::Running => Err(wrong_state("seeking", self.state)),
            _ => self.input.seek(target.timestamp()),
        };
        self.errors.record(result)
    }

    pub fn is_err(&self) -> bool {
        self.errors.is_err()
    }

    /// The most recent failure, left in place.
    pub fn last_error(&self) -> Option<&TraceError> {
        self.errors.peek()
    }

    /// The most recent failure; the handle no longer reports an error.
    pub fn take_error(&mut self) -> Option<TraceError> {
        self.errors.take()
    }

    /// Print `context: message` to stderr and clear the error.
    pub fn perror(&mut self, context: &str) {
        let _ = self.errors.report(&mut io::stderr().lock(), context);
    }

    /// Like [`Trace::perror`], writing to `out`.
    pub fn report_error<W: Write>(&mut self, out: &mut W, context: &str) -> io::Result<()> {
        self.errors.report(out, context)
    }

    /// Release the provider now.
    pub fn destroy(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.input.fin();
            tracing::debug!(format = self.format, "trace destroyed");
        }
    }
}

impl Drop for Trace {
    fn drop(&mut self) {
        self.finish();
    }
}

/// An output trace.
pub struct OutputTrace {
    uri: TraceUri,
    format: &'static str,
    output: Box<dyn OutputFormat>,
    state: TraceState,
    config: OutputConfig,
    errors: ErrorState,
    finished: bool,
}

impl std::fmt::Debug for OutputTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTrace")
            .field("uri", &self.uri)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl OutputTrace {
    /// # Errors
    /// `BadFormat` for a malformed URI or a format that cannot be written;
    /// `InitFailed` when the location is unusable.
    pub fn create(uri: &str) -> Result<Self, TraceError> {
        Self::create_with(format::builtin(), uri)
    }

    pub fn create_with(registry: &Registry, uri: &str) -> Result<Self, TraceError> {
        let (uri, entry) = resolve(registry, uri)?;
        let open = entry.output.ok_or_else(|| {
            TraceError::BadFormat(format!("format '{}' cannot be written", entry.name))
        })?;
        let output = open(&uri.location)?;
        tracing::debug!(format = entry.name, location = %uri.location, "output trace created");
        Ok(Self {
            uri,
            format: entry.name,
            output,
            state: TraceState::Config,
            config: OutputConfig::default(),
            errors: ErrorState::default(),
            finished: false,
        })
    }

    pub fn uri(&self) -> &TraceUri {
        &self.uri
    }

    pub fn format_name(&self) -> &'static str {
        self.format
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.config
    }

    /// # Errors
    /// `Unsupported` once started; `OptionUnavailable` when the provider
    /// rejects the option.
    pub fn config(&mut self, option: OutputOption) -> Result<(), TraceError> {
        let result = self.try_config(option);
        self.errors.record(result)
    }

    fn try_config(&mut self, option: OutputOption) -> Result<(), TraceError> {
        if self.state != TraceState::Config {
            return Err(wrong_state("configuring", self.state));
        }
        self.output.config(&option)?;
        tracing::debug!(option = option.name(), "output option accepted");
        self.config.apply(option);
        Ok(())
    }

    pub fn config_str(&mut self, text: &str) -> Result<(), TraceError> {
        let result = OutputOption::parse(text).and_then(|option| self.try_config(option));
        self.errors.record(result)
    }

    /// Open the destination.
    pub fn start(&mut self) -> Result<(), TraceError> {
        let result = match self.state {
            TraceState::Config => self.output.start(&self.config),
            _ => Err(wrong_state("starting", self.state)),
        };
        if result.is_ok() {
            tracing::debug!("output trace running");
            self.state = TraceState::Running;
        }
        self.errors.record(result)
    }

    /// Returns the bytes written.
    ///
    /// # Errors
    /// `Unsupported` unless running; `NoConversion` when the format cannot
    /// represent the packet.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<usize, TraceError> {
        let result = match self.state {
            TraceState::Running => self.output.write_packet(packet),
            _ => Err(wrong_state("writing", self.state)),
        };
        self.errors.record(result)
    }

    pub fn is_err(&self) -> bool {
        self.errors.is_err()
    }

    pub fn last_error(&self) -> Option<&TraceError> {
        self.errors.peek()
    }

    pub fn take_error(&mut self) -> Option<TraceError> {
        self.errors.take()
    }

    pub fn perror(&mut self, context: &str) {
        let _ = self.errors.report(&mut io::stderr().lock(), context);
    }

    pub fn report_error<W: Write>(&mut self, out: &mut W, context: &str) -> io::Result<()> {
        self.errors.report(out, context)
    }

    /// Flush and close the destination.
    ///
    /// # Errors
    /// Failures while flushing buffered or compressed data.
    pub fn destroy(mut self) -> Result<(), TraceError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), TraceError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let result = self.output.fin();
        tracing::debug!(format = self.format, ok = result.is_ok(), "output trace destroyed");
        result
    }
}

impl Drop for OutputTrace {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(%err, "output trace failed to close");
        }
    }
}

/// A format-only handle for building packets without a source.
///
/// The URI's location is ignored.
///
/// # Examples
/// ```
/// use tracekit_core::{DeadTrace, LinkType, Timestamp};
///
/// let dead = DeadTrace::create("erf:")?;
/// let packet = dead.build_packet(LinkType::Ethernet, Timestamp::from_parts(1, 0), &[0u8; 60])?;
/// assert_eq!(packet.capture_length(), 60);
/// assert_eq!(packet.framing_length(), 18);
/// # Ok::<(), tracekit_core::TraceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DeadTrace {
    format: &'static str,
    packet_format: PacketFormat,
}

impl DeadTrace {
    /// # Errors
    /// `BadFormat` for a malformed URI or an unknown format.
    pub fn create(uri: &str) -> Result<Self, TraceError> {
        Self::create_with(format::builtin(), uri)
    }

    pub fn create_with(registry: &Registry, uri: &str) -> Result<Self, TraceError> {
        let (_, entry) = resolve(registry, uri)?;
        Ok(Self {
            format: entry.name,
            packet_format: entry.packet_format,
        })
    }

    pub fn format_name(&self) -> &'static str {
        self.format
    }

    pub fn packet_format(&self) -> PacketFormat {
        self.packet_format
    }

    /// Frame `data` as a packet of this handle's format.
    ///
    /// # Errors
    /// `NoConversion` when the format has no encoding for `link_type` or
    /// cannot hold `data`.
    pub fn build_packet(
        &self,
        link_type: LinkType,
        ts: Timestamp,
        data: &[u8],
    ) -> Result<Packet, TraceError> {
        let no_conversion = || {
            TraceError::NoConversion(format!("{} packet in {} format", link_type.name(), self.format))
        };
        let len = data.len();
        let mut packet = Packet::new();
        match self.packet_format {
            PacketFormat::Pcap(_) => {
                let dlt = link_type.to_dlt().ok_or_else(no_conversion)?;
                let caplen = format::clamp_u32(len);
                let header = pcap::layout::record_header(ts, caplen, caplen);
                packet.load_owned(PacketFormat::Pcap(dlt), &header, data);
            }
            PacketFormat::Erf => {
                let erf_type = link_type.to_erf_type().ok_or_else(no_conversion)?;
                if erf::layout::framing_len(erf_type) + len > erf::layout::MAX_RECORD_LEN {
                    return Err(no_conversion());
                }
                let header = erf::layout::record_header(ts, erf_type, None, len, len);
                packet.load_owned(PacketFormat::Erf, &header, data);
            }
            PacketFormat::Native(_) => {
                let header = int::layout::record_header(ts, len, len, int::layout::PACKET_HOST);
                packet.load_owned(PacketFormat::Native(link_type), &header, data);
            }
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeadTrace, OutputTrace, SeekTarget, Trace, TraceState};
    use crate::config::TraceOption;
    use crate::error::ErrorKind;
    use crate::event::TraceEvent;
    use crate::filter::Filter;
    use crate::format::PacketFormat;
    use crate::linktype::LinkType;
    use crate::packet::Packet;
    use crate::timestamp::Timestamp;

    /// Write a pcap file of Ethernet frames with the given second stamps.
    fn pcap_file(dir: &tempfile::TempDir, stamps: &[u32]) -> String {
        let path = dir.path().join("trace.pcap");
        let location = path.to_str().unwrap().to_string();
        let dead = DeadTrace::create("pcapfile:").unwrap();
        let mut out = OutputTrace::create(&format!("pcapfile:{location}")).unwrap();
        out.start().unwrap();
        for &secs in stamps {
            let packet = dead
                .build_packet(LinkType::Ethernet, Timestamp::from_parts(secs, 0), &[0u8; 100])
                .unwrap();
            out.write_packet(&packet).unwrap();
        }
        out.destroy().unwrap();
        location
    }

    #[test]
    fn lifecycle_guards() {
        let dir = tempfile::tempdir().unwrap();
        let location = pcap_file(&dir, &[1, 2]);
        let mut trace = Trace::create(&format!("pcap:{location}")).unwrap();
        assert_eq!(trace.format_name(), "pcapfile");
        let mut packet = Packet::new();

        let err = trace.read_packet(&mut packet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(trace.take_error(), Some(err));
        assert_eq!(trace.pause().unwrap_err().kind(), ErrorKind::Unsupported);

        trace.start().unwrap();
        assert_eq!(trace.state(), TraceState::Running);
        assert_eq!(trace.start().unwrap_err().kind(), ErrorKind::Unsupported);
        let err = trace.config(TraceOption::Snaplen(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = trace.seek(SeekTarget::Seconds(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        trace.pause().unwrap();
        assert_eq!(trace.read_packet(&mut packet).unwrap_err().kind(), ErrorKind::Unsupported);
        trace.config(TraceOption::Snaplen(10)).unwrap();
        trace.start().unwrap();
        assert!(trace.read_packet(&mut packet).unwrap() > 0);
        assert_eq!(packet.capture_length(), 10);
        trace.destroy();
    }

    #[test]
    fn promisc_is_unavailable_for_files() {
        let dir = tempfile::tempdir().unwrap();
        let location = pcap_file(&dir, &[1]);
        let mut trace = Trace::create(&format!("pcapfile:{location}")).unwrap();
        let err = trace.config(TraceOption::Promisc(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OptionUnavailable);
        assert!(trace.is_err());
        let err = trace.config_str("colour=blue").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOption);
        assert_eq!(trace.last_error().map(|e| e.kind()), Some(ErrorKind::UnknownOption));
    }

    #[test]
    fn seek_by_each_clock() {
        let dir = tempfile::tempdir().unwrap();
        let location = pcap_file(&dir, &[10, 20, 30]);
        let mut trace = Trace::create(&format!("pcapfile:{location}")).unwrap();
        let mut packet = Packet::new();

        trace.seek(SeekTarget::Seconds(15.5)).unwrap();
        trace.start().unwrap();
        trace.read_packet(&mut packet).unwrap();
        assert_eq!(packet.timestamp().secs(), 20);

        trace.pause().unwrap();
        trace.seek(SeekTarget::Erf(Timestamp::from_parts(30, 0).erf())).unwrap();
        trace.start().unwrap();
        trace.read_packet(&mut packet).unwrap();
        assert_eq!(packet.timestamp().secs(), 30);

        trace.pause().unwrap();
        trace.seek(SeekTarget::Timeval(std::time::Duration::from_secs(1))).unwrap();
        trace.start().unwrap();
        trace.read_packet(&mut packet).unwrap();
        assert_eq!(packet.timestamp().secs(), 10);
    }

    #[test]
    fn event_applies_the_filter_and_terminates_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let location = pcap_file(&dir, &[1]);
        let mut trace = Trace::create(&format!("pcapfile:{location}")).unwrap();
        trace.config(TraceOption::Filter(Filter::new("tcp and"))).unwrap();
        trace.start().unwrap();
        let mut packet = Packet::new();
        assert_eq!(trace.event(&mut packet), TraceEvent::Terminate);
        assert_eq!(trace.take_error().map(|e| e.kind()), Some(ErrorKind::BadFormat));

        let mut trace = Trace::create(&format!("pcapfile:{location}")).unwrap();
        trace.config(TraceOption::Filter(Filter::new("not tcp"))).unwrap();
        trace.start().unwrap();
        assert_eq!(trace.event(&mut packet), TraceEvent::Packet(116));
        assert_eq!(trace.event(&mut packet), TraceEvent::Terminate);
        assert!(!trace.is_err());
    }

    #[test]
    fn create_rejects_bad_uris() {
        assert_eq!(Trace::create("nocolon").unwrap_err().kind(), ErrorKind::BadFormat);
        assert_eq!(Trace::create("bogus:x").unwrap_err().kind(), ErrorKind::BadFormat);
        assert_eq!(
            OutputTrace::create("rtclient:localhost").unwrap_err().kind(),
            ErrorKind::BadFormat
        );
        assert_eq!(
            Trace::create("pcapfile:/nonexistent/x.pcap").unwrap_err().kind(),
            ErrorKind::InitFailed
        );
    }

    #[test]
    fn output_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.erf");
        let mut out = OutputTrace::create(&format!("erf:{}", path.display())).unwrap();
        let packet = DeadTrace::create("erf:")
            .unwrap()
            .build_packet(LinkType::Ethernet, Timestamp::default(), &[1; 20])
            .unwrap();
        assert_eq!(out.write_packet(&packet).unwrap_err().kind(), ErrorKind::Unsupported);
        out.config_str("compress=3").unwrap();
        out.start().unwrap();
        assert_eq!(out.config_str("compress=1").unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(out.write_packet(&packet).unwrap(), 38);
        out.destroy().unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn dead_traces_frame_packets() {
        let pcap = DeadTrace::create("pcap:ignored").unwrap();
        let packet = pcap.build_packet(LinkType::None, Timestamp::default(), &[0x45; 20]).unwrap();
        assert!(matches!(packet.format(), Some(PacketFormat::Pcap(_))));
        assert_eq!(packet.link_type(), Some(LinkType::None));

        let erf = DeadTrace::create("erf:").unwrap();
        let err = erf.build_packet(LinkType::LinuxSll, Timestamp::default(), &[0; 16]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConversion);
        let err = erf.build_packet(LinkType::Ethernet, Timestamp::default(), &[0; 65_535]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConversion);

        let native = DeadTrace::create("rtclient:").unwrap();
        assert_eq!(native.packet_format(), PacketFormat::Erf);
    }
}
