//! Fixture writers shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use etherparse::PacketBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;

/// One frame to write, stamped with whole seconds plus microseconds.
pub struct Frame {
    pub secs: u32,
    pub micros: u32,
    pub data: Vec<u8>,
    /// Wire length when larger than the captured data.
    pub wire_len: Option<u32>,
}

impl Frame {
    pub fn new(secs: u32, data: Vec<u8>) -> Self {
        Self {
            secs,
            micros: 0,
            data,
            wire_len: None,
        }
    }
}

pub fn udp_frame(source_port: u16, payload_len: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 0x0a], [0x02, 0, 0, 0, 0, 0x0b])
        .ipv4([10, 0, 0, 10], [10, 0, 0, 11], 64)
        .udp(source_port, 9000);
    let mut frame = Vec::with_capacity(builder.size(payload_len));
    builder.write(&mut frame, &vec![0x5a; payload_len]).unwrap();
    frame
}

pub fn tcp_frame(destination_port: u16, payload_len: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 0x0c], [0x02, 0, 0, 0, 0, 0x0d])
        .ipv4([172, 16, 0, 1], [172, 16, 0, 2], 64)
        .tcp(51_000, destination_port, 100, 4096);
    let mut frame = Vec::with_capacity(builder.size(payload_len));
    builder.write(&mut frame, &vec![0xa5; payload_len]).unwrap();
    frame
}

/// Five frames, alternating UDP and TCP, one second apart.
pub fn five_frames() -> Vec<Frame> {
    (0..5u32)
        .map(|i| {
            let data = if i % 2 == 0 {
                udp_frame(5000 + i as u16, 100 + i as usize * 10)
            } else {
                tcp_frame(80, 200)
            };
            Frame::new(1_700_000_000 + i, data)
        })
        .collect()
}

fn wire_len(frame: &Frame) -> u32 {
    frame.wire_len.unwrap_or(frame.data.len() as u32)
}

pub fn pcap_bytes(frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65_535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for frame in frames {
        out.extend_from_slice(&frame.secs.to_le_bytes());
        out.extend_from_slice(&frame.micros.to_le_bytes());
        out.extend_from_slice(&(frame.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&wire_len(frame).to_le_bytes());
        out.extend_from_slice(&frame.data);
    }
    out
}

fn block(out: &mut Vec<u8>, block_type: u32, body: &[u8]) {
    let padded = body.len().div_ceil(4) * 4;
    let total = (12 + padded) as u32;
    out.extend_from_slice(&block_type.to_le_bytes());
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(body);
    out.resize(out.len() + padded - body.len(), 0);
    out.extend_from_slice(&total.to_le_bytes());
}

pub fn pcapng_bytes(frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::new();

    let mut shb = Vec::new();
    shb.extend_from_slice(&0x1a2b_3c4du32.to_le_bytes());
    shb.extend_from_slice(&1u16.to_le_bytes());
    shb.extend_from_slice(&0u16.to_le_bytes());
    shb.extend_from_slice(&(-1i64).to_le_bytes());
    block(&mut out, 0x0a0d_0d0a, &shb);

    let mut idb = Vec::new();
    idb.extend_from_slice(&1u16.to_le_bytes());
    idb.extend_from_slice(&0u16.to_le_bytes());
    idb.extend_from_slice(&65_535u32.to_le_bytes());
    block(&mut out, 1, &idb);

    for frame in frames {
        let micros = u64::from(frame.secs) * 1_000_000 + u64::from(frame.micros);
        let mut epb = Vec::new();
        epb.extend_from_slice(&0u32.to_le_bytes());
        epb.extend_from_slice(&((micros >> 32) as u32).to_le_bytes());
        epb.extend_from_slice(&(micros as u32).to_le_bytes());
        epb.extend_from_slice(&(frame.data.len() as u32).to_le_bytes());
        epb.extend_from_slice(&wire_len(frame).to_le_bytes());
        epb.extend_from_slice(&frame.data);
        epb.resize(epb.len().div_ceil(4) * 4, 0);
        block(&mut out, 6, &epb);
    }
    out
}

/// ERF Ethernet records, received on interface 1.
pub fn erf_bytes(frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::new();
    for frame in frames {
        let frac = (u64::from(frame.micros) << 32) / 1_000_000;
        let ts = (u64::from(frame.secs) << 32) | frac;
        out.extend_from_slice(&ts.to_le_bytes());
        out.push(2);
        out.push(1);
        out.extend_from_slice(&((18 + frame.data.len()) as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(wire_len(frame) as u16).to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&frame.data);
    }
    out
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Write `bytes` under `dir` and return a URI for it.
pub fn write_trace(dir: &Path, format: &str, name: &str, bytes: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    format!("{format}:{}", path.display())
}
