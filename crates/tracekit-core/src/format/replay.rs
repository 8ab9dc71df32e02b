//! Reading, pacing and seeking shared by the file-replay providers.

use crate::error::TraceError;
use crate::event::{Pacer, TraceEvent};
use crate::packet::Packet;
use crate::timestamp::Timestamp;

/// Sequential access to the records of a trace file.
pub(crate) trait RecordSource {
    /// Load the next record into `packet`; `0` at the end of the trace.
    fn next_record(&mut self, packet: &mut Packet) -> Result<usize, TraceError>;

    /// Return to the first record.
    fn rewind(&mut self) -> Result<(), TraceError>;
}

#[derive(Debug, Default)]
pub(crate) struct Replay {
    position: Position,
    pacer: Pacer,
}

#[derive(Debug, Default)]
struct Position {
    /// Record located by a seek, delivered before reading further.
    found: Option<(Packet, usize)>,
    /// Latest timestamp pulled from the source since the last rewind.
    high_water: Option<Timestamp>,
}

impl Position {
    fn pull<S: RecordSource>(&mut self, source: &mut S, packet: &mut Packet) -> Result<usize, TraceError> {
        let size = source.next_record(packet)?;
        if size > 0 {
            let ts = packet.timestamp();
            self.high_water = Some(self.high_water.map_or(ts, |high| high.max(ts)));
        }
        Ok(size)
    }

    fn read<S: RecordSource>(&mut self, source: &mut S, packet: &mut Packet) -> Result<usize, TraceError> {
        if let Some((found, size)) = self.found.take() {
            *packet = found;
            return Ok(size);
        }
        self.pull(source, packet)
    }
}

impl Replay {
    pub(crate) fn read<S: RecordSource>(
        &mut self,
        source: &mut S,
        packet: &mut Packet,
    ) -> Result<usize, TraceError> {
        self.position.read(source, packet)
    }

    pub(crate) fn event<S: RecordSource>(
        &mut self,
        source: &mut S,
        packet: &mut Packet,
    ) -> Result<TraceEvent, TraceError> {
        let position = &mut self.position;
        self.pacer.step(packet, |next| position.read(source, next))
    }

    /// Stop pacing. A packet read ahead but not yet due is discarded, so
    /// reading resumes with the record after it.
    pub(crate) fn pause(&mut self) {
        self.pacer.reset();
    }

    /// Linear scan to the first record at or after `target`, rewinding
    /// first when the source has already passed that point.
    pub(crate) fn seek<S: RecordSource>(
        &mut self,
        source: &mut S,
        target: Timestamp,
    ) -> Result<(), TraceError> {
        self.pause();
        if self.position.high_water.is_some_and(|high| high >= target) {
            source.rewind()?;
            self.position.high_water = None;
        }
        self.position.found = None;

        let mut candidate = Packet::new();
        loop {
            let size = self.position.pull(source, &mut candidate)?;
            if size == 0 {
                break;
            }
            if candidate.timestamp() >= target {
                self.position.found = Some((candidate, size));
                break;
            }
        }
        tracing::debug!(target_ts = %target, found = self.position.found.is_some(), "seek finished");
        Ok(())
    }
}
