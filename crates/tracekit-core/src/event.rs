//! Event records for cooperative, non-blocking trace processing.
//!
//! A caller drives a trace with [`crate::Trace::event`] from its own loop
//! and reacts to the returned [`TraceEvent`]: wait on a descriptor, sleep,
//! process a packet, or stop. Nothing here blocks.

use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use crate::error::TraceError;
use crate::packet::Packet;
use crate::timestamp::Timestamp;

/// Outcome of one event step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Nothing buffered; wait until the descriptor is readable.
    IoWait(RawFd),
    /// The next packet is not due yet.
    Sleep(Duration),
    /// A packet of this many bytes was loaded.
    Packet(usize),
    /// The trace ended or failed; check the trace's error state.
    Terminate,
}

/// Replays file packets at the pace they were captured.
///
/// The first packet is due immediately. Each later packet is due once the
/// wall clock has advanced as far past the first delivery as the packet's
/// timestamp is past the first packet's. A packet read early is staged here
/// until it is due.
#[derive(Debug, Default)]
pub(crate) struct Pacer {
    origin: Option<(Timestamp, Instant)>,
    staged: Packet,
    staged_size: Option<usize>,
}

impl Pacer {
    pub(crate) fn step<F>(&mut self, packet: &mut Packet, read: F) -> Result<TraceEvent, TraceError>
    where
        F: FnOnce(&mut Packet) -> Result<usize, TraceError>,
    {
        let size = match self.staged_size {
            Some(size) => size,
            None => {
                let size = read(&mut self.staged)?;
                if size == 0 {
                    return Ok(TraceEvent::Terminate);
                }
                self.staged_size = Some(size);
                size
            }
        };

        let ts = self.staged.timestamp();
        let now = Instant::now();
        let (origin_ts, origin_at) = *self.origin.get_or_insert((ts, now));
        let due = origin_at + ts.saturating_since(origin_ts);
        if due > now {
            return Ok(TraceEvent::Sleep(due - now));
        }

        // The caller's old buffer becomes the staging buffer for the next read.
        std::mem::swap(packet, &mut self.staged);
        self.staged_size = None;
        Ok(TraceEvent::Packet(size))
    }

    /// Forget timing and drop any staged packet.
    pub(crate) fn reset(&mut self) {
        self.origin = None;
        self.staged.clear();
        self.staged_size = None;
    }
}
