//! tracekit core library: reading, filtering and writing packet traces.
//!
//! A trace is named by a `format:location` URI. The format selects a
//! provider from the [`Registry`]: pcap/pcapng and ERF files (plain or
//! gzip-compressed), an ERF relay over TCP, or live capture from a network
//! interface. Handles ([`Trace`], [`OutputTrace`]) drive the provider
//! through its lifecycle and keep a sticky error slot next to the `Result`
//! of every call. Packets carry their framing tag, so the [`decode`]
//! functions and [`Filter`]s work on them after the trace is gone.
//!
//! Invariants:
//! - A packet's framing plus captured bytes never exceed its buffer, and the
//!   captured length never exceeds the wire length.
//! - A failed read leaves the packet as it was.
//! - Decoding never reads past the captured bytes; a missing layer is
//!   `None`, never an error.
//!
//! # Examples
//! ```no_run
//! use tracekit_core::{OutputTrace, Packet, Trace};
//!
//! let mut input = Trace::create("erf:capture.erf")?;
//! input.config_str("filter=tcp port 80")?;
//! input.start()?;
//!
//! let mut output = OutputTrace::create("pcapfile:web.pcap")?;
//! output.start()?;
//!
//! let mut packet = Packet::new();
//! while input.read_packet(&mut packet)? > 0 {
//!     output.write_packet(&packet)?;
//! }
//! output.destroy()?;
//! # Ok::<(), tracekit_core::TraceError>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod event;
pub mod filter;
pub mod format;
pub mod linktype;
pub mod packet;
pub mod protocols;
pub mod timestamp;
pub mod trace;
pub mod uri;

pub use config::{InputConfig, OpenFlags, OutputConfig, OutputOption, TraceOption};
pub use error::{ErrorKind, ErrorState, TraceError};
pub use event::TraceEvent;
pub use filter::Filter;
pub use format::{Direction, FormatEntry, InputFormat, OutputFormat, PacketFormat, Registry};
pub use linktype::LinkType;
pub use packet::{BufferOwnership, Packet, PacketBuffer};
pub use protocols::{MacAddr, next_option};
pub use timestamp::Timestamp;
pub use trace::{DeadTrace, OutputTrace, SeekTarget, Trace, TraceState};
pub use uri::{TraceUri, parse_uri};
