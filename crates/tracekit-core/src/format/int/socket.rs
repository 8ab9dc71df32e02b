use std::ffi::CString;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use libc::{c_int, c_void, sockaddr, sockaddr_ll, socklen_t};

use crate::config::{InputConfig, TraceOption};
use crate::error::TraceError;
use crate::event::TraceEvent;
use crate::format::io::wait_readable;
use crate::format::{InputFormat, PacketFormat};
use crate::linktype::LinkType;
use crate::packet::Packet;
use crate::timestamp::Timestamp;

use super::layout;

/// Capture buffer when no snaplen is configured.
const DEFAULT_CAPTURE_LEN: usize = 65_535;

/// Live capture from one network interface through an `AF_PACKET` socket.
///
/// The interface is resolved when the handle is created; the socket is
/// opened on start and closed on pause.
pub struct IntInput {
    interface: String,
    ifindex: c_int,
    socket: Option<OwnedFd>,
    scratch: Vec<u8>,
}

/// `ETH_P_ALL` in network byte order, as the socket calls expect.
fn all_protocols() -> u16 {
    (libc::ETH_P_ALL as u16).to_be()
}

/// Framing of packets from an interface of hardware type `hatype`.
fn link_type_for(hatype: u16) -> Option<LinkType> {
    match hatype {
        libc::ARPHRD_ETHER | libc::ARPHRD_LOOPBACK => Some(LinkType::Ethernet),
        libc::ARPHRD_NONE | libc::ARPHRD_PPP => Some(LinkType::None),
        libc::ARPHRD_IEEE80211 => Some(LinkType::Ieee80211),
        libc::ARPHRD_IEEE80211_PRISM => Some(LinkType::Ieee80211Prism),
        _ => None,
    }
}

fn check(ret: c_int) -> io::Result<c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

impl IntInput {
    /// # Errors
    /// `InitFailed` when no interface has this name.
    pub fn open(interface: &str) -> Result<Self, TraceError> {
        let name = CString::new(interface).map_err(|e| TraceError::init(interface, e))?;
        // Safety: `name` is a valid NUL-terminated string for the call.
        let ifindex = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if ifindex == 0 {
            return Err(TraceError::init(interface, io::Error::last_os_error()));
        }
        Ok(Self {
            interface: interface.to_string(),
            ifindex: ifindex as c_int,
            socket: None,
            scratch: Vec::new(),
        })
    }

    fn open_socket(&self, promisc: bool) -> io::Result<OwnedFd> {
        // Safety: plain socket creation; ownership of the descriptor moves
        // into `OwnedFd` immediately.
        let fd = check(unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                c_int::from(all_protocols()),
            )
        })?;
        let socket = unsafe { OwnedFd::from_raw_fd(fd) };

        // Safety: an all-zero `sockaddr_ll` is valid; the fields that matter
        // are set below and the size passed matches the type.
        let mut addr: sockaddr_ll = unsafe { mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as u16;
        addr.sll_protocol = all_protocols();
        addr.sll_ifindex = self.ifindex;
        check(unsafe {
            libc::bind(
                socket.as_raw_fd(),
                (&addr as *const sockaddr_ll).cast::<sockaddr>(),
                mem::size_of::<sockaddr_ll>() as socklen_t,
            )
        })?;

        if promisc {
            // Safety: as above for `packet_mreq`.
            let mut membership: libc::packet_mreq = unsafe { mem::zeroed() };
            membership.mr_ifindex = self.ifindex;
            membership.mr_type = libc::PACKET_MR_PROMISC as u16;
            check(unsafe {
                libc::setsockopt(
                    socket.as_raw_fd(),
                    libc::SOL_PACKET,
                    libc::PACKET_ADD_MEMBERSHIP,
                    (&membership as *const libc::packet_mreq).cast::<c_void>(),
                    mem::size_of::<libc::packet_mreq>() as socklen_t,
                )
            })?;
        }
        Ok(socket)
    }

    fn fd(&self) -> Result<RawFd, TraceError> {
        self.socket
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| TraceError::Unsupported("reading from a stopped capture".into()))
    }

    /// Receive one frame without blocking. `Ok(None)` when nothing is
    /// queued.
    fn receive(&mut self, packet: &mut Packet) -> Result<Option<usize>, TraceError> {
        let fd = self.fd()?;
        loop {
            // Safety: as above for `sockaddr_ll`.
            let mut from: sockaddr_ll = unsafe { mem::zeroed() };
            let mut from_len = mem::size_of::<sockaddr_ll>() as socklen_t;
            // Safety: the buffer and address pointers are valid for the
            // lengths passed; MSG_TRUNC makes the result the wire length.
            let received = unsafe {
                libc::recvfrom(
                    fd,
                    self.scratch.as_mut_ptr().cast::<c_void>(),
                    self.scratch.len(),
                    libc::MSG_TRUNC,
                    (&mut from as *mut sockaddr_ll).cast::<sockaddr>(),
                    &mut from_len,
                )
            };
            if received < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::WouldBlock => return Ok(None),
                    _ => return Err(TraceError::bad_packet(&self.interface, err)),
                }
            }

            let wirelen = received as usize;
            let Some(link) = link_type_for(from.sll_hatype) else {
                tracing::warn!(
                    interface = %self.interface,
                    hatype = from.sll_hatype,
                    "skipping frame from unsupported hardware type"
                );
                continue;
            };
            let caplen = wirelen.min(self.scratch.len());
            let header =
                layout::record_header(Timestamp::now(), caplen, wirelen, from.sll_pkttype);
            packet.load_owned(PacketFormat::Native(link), &header, &self.scratch[..caplen]);
            tracing::trace!(caplen, wirelen, "captured frame");
            return Ok(Some(layout::HEADER_LEN + caplen));
        }
    }
}

pub(crate) fn open_input(location: &str) -> Result<Box<dyn InputFormat>, TraceError> {
    Ok(Box::new(IntInput::open(location)?))
}

impl InputFormat for IntInput {
    fn config(&mut self, option: &TraceOption) -> Result<(), TraceError> {
        match option {
            TraceOption::Snaplen(_) | TraceOption::Promisc(_) | TraceOption::Filter(_) => Ok(()),
        }
    }

    fn start(&mut self, config: &InputConfig) -> Result<(), TraceError> {
        let socket = self
            .open_socket(config.promisc)
            .map_err(|e| TraceError::init(&self.interface, e))?;
        let capture_len = config
            .snaplen
            .map_or(DEFAULT_CAPTURE_LEN, |len| len as usize)
            .max(1);
        self.scratch.resize(capture_len, 0);
        self.socket = Some(socket);
        tracing::debug!(interface = %self.interface, promisc = config.promisc, "capture started");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), TraceError> {
        if self.socket.take().is_some() {
            tracing::debug!(interface = %self.interface, "capture stopped");
        }
        Ok(())
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<usize, TraceError> {
        loop {
            if let Some(size) = self.receive(packet)? {
                return Ok(size);
            }
            wait_readable(self.fd()?).map_err(|e| TraceError::bad_packet(&self.interface, e))?;
        }
    }

    fn event(&mut self, packet: &mut Packet) -> Result<TraceEvent, TraceError> {
        match self.receive(packet)? {
            Some(size) => Ok(TraceEvent::Packet(size)),
            None => Ok(TraceEvent::IoWait(self.fd()?)),
        }
    }

    fn fin(&mut self) {
        self.socket = None;
    }
}
