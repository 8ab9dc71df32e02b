//! Per-trace statistics for the `info` command.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracekit_core::{Packet, Timestamp, decode};

pub const REPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct Report {
    pub report_version: u32,
    pub traces: Vec<TraceSummary>,
}

#[derive(Debug, Default, Serialize)]
pub struct TraceSummary {
    pub uri: String,
    pub format: String,
    pub packets: u64,
    pub captured_bytes: u64,
    pub wire_bytes: u64,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub duration_seconds: Option<f64>,
    pub link_types: BTreeMap<&'static str, u64>,
    pub transports: BTreeMap<&'static str, u64>,
    /// Error that ended the read early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    first: Option<Timestamp>,
    #[serde(skip)]
    last: Option<Timestamp>,
}

impl TraceSummary {
    pub fn new(uri: &str, format: &str) -> Self {
        Self {
            uri: uri.to_string(),
            format: format.to_string(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, packet: &Packet) {
        self.packets += 1;
        self.captured_bytes += packet.capture_length() as u64;
        self.wire_bytes += packet.wire_length() as u64;
        let ts = packet.timestamp();
        self.first = Some(self.first.map_or(ts, |first| first.min(ts)));
        self.last = Some(self.last.map_or(ts, |last| last.max(ts)));

        let link = packet.link_type().map_or("unknown", |link| link.name());
        *self.link_types.entry(link).or_default() += 1;
        *self.transports.entry(transport_name(packet)).or_default() += 1;
    }

    /// Fill the derived timestamp fields.
    pub fn finish(&mut self) -> Result<()> {
        if let (Some(first), Some(last)) = (self.first, self.last) {
            self.first_timestamp = Some(rfc3339(first)?);
            self.last_timestamp = Some(rfc3339(last)?);
            self.duration_seconds = Some(last.saturating_since(first).as_secs_f64());
        }
        Ok(())
    }
}

fn transport_name(packet: &Packet) -> &'static str {
    if decode::tcp(packet).is_some() {
        "tcp"
    } else if decode::udp(packet).is_some() {
        "udp"
    } else if decode::icmp(packet).is_some() {
        "icmp"
    } else if decode::network(packet).is_some() {
        "other-ip"
    } else {
        "non-ip"
    }
}

fn rfc3339(ts: Timestamp) -> Result<String> {
    let nanos = i128::try_from(ts.as_duration().as_nanos()).context("timestamp out of range")?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .context("timestamp out of range")?
        .format(&Rfc3339)
        .context("timestamp formatting failed")
}

#[cfg(test)]
mod tests {
    use super::{TraceSummary, rfc3339};
    use tracekit_core::{DeadTrace, LinkType, Timestamp};

    #[test]
    fn formats_rfc3339() {
        assert_eq!(
            rfc3339(Timestamp::from_parts(1_700_000_000, 0)).unwrap(),
            "2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn counts_link_and_transport() {
        let dead = DeadTrace::create("pcap:").unwrap();
        let mut summary = TraceSummary::new("pcap:x", "pcapfile");
        let raw = dead
            .build_packet(LinkType::Ethernet, Timestamp::from_parts(20, 0), &[0u8; 60])
            .unwrap();
        summary.add(&raw);
        let earlier = dead
            .build_packet(LinkType::Ethernet, Timestamp::from_parts(10, 0), &[0u8; 40])
            .unwrap();
        summary.add(&earlier);
        summary.finish().unwrap();

        assert_eq!(summary.packets, 2);
        assert_eq!(summary.captured_bytes, 100);
        assert_eq!(summary.link_types["ethernet"], 2);
        assert_eq!(summary.transports["non-ip"], 2);
        assert_eq!(summary.duration_seconds, Some(10.0));
        assert_eq!(summary.first_timestamp.as_deref(), Some("1970-01-01T00:00:10Z"));
    }
}
