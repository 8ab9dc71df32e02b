use std::io::{self, Read};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};

use bytes::BytesMut;

use crate::config::{InputConfig, TraceOption};
use crate::error::TraceError;
use crate::event::TraceEvent;
use crate::format::erf::layout;
use crate::format::{InputFormat, PacketFormat, io::wait_readable};
use crate::packet::Packet;

use super::DEFAULT_PORT;

const RECV_CHUNK: usize = 64 * 1024;
const DEFAULT_HOST: &str = "localhost";

/// Receives ERF records from a relay.
///
/// The socket is non-blocking. [`InputFormat::read_packet`] waits for data
/// with `poll`; [`InputFormat::event`] never waits and reports the socket
/// descriptor instead.
pub struct RtInput {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    buffer: BytesMut,
    closed: bool,
}

/// Split `host[:port]`; IPv6 hosts with a port need brackets.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// assert_eq!(parse_address("relay:4000").unwrap(), ("relay".into(), 4000));
/// assert_eq!(parse_address("[::1]").unwrap(), ("::1".into(), 3435));
/// ```
///
/// # Errors
/// `BadFormat` when the port is not a number.
pub(crate) fn parse_address(location: &str) -> Result<(String, u16), TraceError> {
    let bad_port =
        |port: &str| TraceError::BadFormat(format!("invalid port '{port}' in '{location}'"));

    let (host, port) = if let Some(rest) = location.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(TraceError::BadFormat(format!("unclosed '[' in '{location}'")));
        };
        (host, tail.strip_prefix(':'))
    } else {
        match location.split_once(':') {
            Some((host, port)) if !port.contains(':') => (host, Some(port)),
            // bare IPv6 address
            _ => (location, None),
        }
    };
    let port = match port {
        Some(text) => text.parse().map_err(|_| bad_port(text))?,
        None => DEFAULT_PORT,
    };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    Ok((host.to_string(), port))
}

impl RtInput {
    /// Connect to the relay.
    ///
    /// # Errors
    /// `BadFormat` for an unparsable location, `InitFailed` when the relay
    /// cannot be reached.
    pub fn connect(location: &str) -> Result<Self, TraceError> {
        let (host, port) = parse_address(location)?;
        let mut input = Self {
            host,
            port,
            stream: None,
            buffer: BytesMut::new(),
            closed: false,
        };
        input.reconnect()?;
        Ok(input)
    }

    fn reconnect(&mut self) -> Result<(), TraceError> {
        let context = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .and_then(|stream| {
                stream.set_nonblocking(true)?;
                Ok(stream)
            })
            .map_err(|e| TraceError::init(&context, e))?;
        tracing::debug!(relay = %context, "relay connected");
        self.stream = Some(stream);
        self.buffer.clear();
        self.closed = false;
        Ok(())
    }

    /// Move the next complete record out of the receive buffer.
    fn take_record(&mut self, packet: &mut Packet) -> Result<Option<usize>, TraceError> {
        loop {
            if self.buffer.len() < layout::RECORD_HEADER_LEN {
                return Ok(None);
            }
            let header = &self.buffer[..layout::RECORD_HEADER_LEN];
            let rlen = layout::record_len(header);
            let erf_type = header[layout::TYPE_OFFSET];
            let framing = layout::framing_len(erf_type);
            if rlen < framing {
                return Err(TraceError::BadPacket(format!(
                    "relay record length {rlen} is shorter than its {framing}-byte header"
                )));
            }
            if self.buffer.len() < rlen {
                return Ok(None);
            }
            let record = self.buffer.split_to(rlen).freeze();
            if erf_type & layout::TYPE_EXTENSION_BIT != 0 {
                tracing::warn!(erf_type, "skipping relay record with extension headers");
                continue;
            }
            packet.load_external(PacketFormat::Erf, record, framing);
            tracing::trace!(size = rlen, "relay record");
            return Ok(Some(rlen));
        }
    }

    /// Pull whatever the socket has. `Ok(false)` when it would block.
    fn fill(&mut self) -> Result<bool, TraceError> {
        let mut chunk = [0u8; RECV_CHUNK];
        let Some(stream) = self.stream.as_mut() else {
            return Err(TraceError::Unsupported("reading from a disconnected relay".into()));
        };
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("relay closed the connection");
                    self.closed = true;
                    return Ok(true);
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(err) => return Err(TraceError::bad_packet("relay receive", err)),
            }
        }
    }

    /// After the relay closed: a clean end, or `BadPacket` once for a record
    /// cut short.
    fn check_leftover(&mut self) -> Result<(), TraceError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let leftover = self.buffer.len();
        tracing::warn!(leftover, "relay closed mid-record");
        self.buffer.clear();
        Err(TraceError::BadPacket(format!(
            "relay closed with {leftover} bytes of an incomplete record"
        )))
    }

    fn fd(&self) -> Result<RawFd, TraceError> {
        self.stream
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| TraceError::Unsupported("reading from a disconnected relay".into()))
    }
}

pub(crate) fn open_input(location: &str) -> Result<Box<dyn InputFormat>, TraceError> {
    Ok(Box::new(RtInput::connect(location)?))
}

impl InputFormat for RtInput {
    fn config(&mut self, option: &TraceOption) -> Result<(), TraceError> {
        match option {
            TraceOption::Snaplen(_) | TraceOption::Filter(_) => Ok(()),
            TraceOption::Promisc(_) => Err(TraceError::OptionUnavailable(format!(
                "{} on a relay",
                option.name()
            ))),
        }
    }

    fn start(&mut self, _config: &InputConfig) -> Result<(), TraceError> {
        if self.stream.is_none() {
            self.reconnect()?;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), TraceError> {
        if self.stream.take().is_some() {
            tracing::debug!(relay = %self.host, "relay disconnected on pause");
        }
        self.buffer.clear();
        Ok(())
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        loop {
            if let Some(size) = self.take_record(packet)? {
                return Ok(size);
            }
            if self.closed {
                self.check_leftover()?;
                return Ok(0);
            }
            if !self.fill()? {
                wait_readable(self.fd()?)
                    .map_err(|e| TraceError::bad_packet("relay poll", e))?;
            }
        }
    }

    fn event(&mut self, packet: &mut Packet) -> Result<TraceEvent, TraceError> {
        loop {
            if let Some(size) = self.take_record(packet)? {
                return Ok(TraceEvent::Packet(size));
            }
            if self.closed {
                self.check_leftover()?;
                return Ok(TraceEvent::Terminate);
            }
            if !self.fill()? {
                return Ok(TraceEvent::IoWait(self.fd()?));
            }
        }
    }

    fn fin(&mut self) {
        self.stream = None;
    }
}
