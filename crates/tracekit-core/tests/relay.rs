mod common;

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use common::{Frame, erf_bytes, udp_frame};
use tracekit_core::{ErrorKind, Packet, SeekTarget, Trace, TraceEvent, decode};

fn relay() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("rtclient:{}", listener.local_addr().unwrap());
    (listener, uri)
}

/// Step until something other than an io-wait comes back.
fn step_past_waits(trace: &mut Trace, packet: &mut Packet) -> TraceEvent {
    for _ in 0..500 {
        match trace.event(packet) {
            TraceEvent::IoWait(_) => thread::sleep(Duration::from_millis(5)),
            other => return other,
        }
    }
    panic!("relay never became readable");
}

#[test]
fn io_wait_until_the_relay_sends() {
    let (listener, uri) = relay();
    let mut trace = Trace::create(&uri).unwrap();
    let (mut server, _) = listener.accept().unwrap();
    trace.start().unwrap();

    let mut packet = Packet::new();
    match trace.event(&mut packet) {
        TraceEvent::IoWait(fd) => assert!(fd >= 0),
        other => panic!("expected an io-wait, got {other:?}"),
    }

    server.write_all(&erf_bytes(&[Frame::new(42, udp_frame(7, 16))])).unwrap();
    match step_past_waits(&mut trace, &mut packet) {
        TraceEvent::Packet(size) => assert!(size > 0),
        other => panic!("expected a packet, got {other:?}"),
    }
    assert_eq!(packet.timestamp().secs(), 42);
    assert_eq!(decode::source_port(&packet), Some(7));
    assert!(packet.is_zero_copy());

    drop(server);
    assert_eq!(step_past_waits(&mut trace, &mut packet), TraceEvent::Terminate);
    assert!(!trace.is_err());
}

#[test]
fn relay_closing_mid_record_reports_an_error() {
    let (listener, uri) = relay();
    let mut trace = Trace::create(&uri).unwrap();
    let (mut server, _) = listener.accept().unwrap();
    trace.start().unwrap();

    let frames = [Frame::new(1, udp_frame(7, 16)), Frame::new(2, udp_frame(8, 16))];
    let bytes = erf_bytes(&frames);
    let first = bytes.len() / 2;
    server.write_all(&bytes[..first + 12]).unwrap();
    drop(server);

    let mut packet = Packet::new();
    assert!(matches!(step_past_waits(&mut trace, &mut packet), TraceEvent::Packet(_)));
    assert_eq!(step_past_waits(&mut trace, &mut packet), TraceEvent::Terminate);
    let err = trace.take_error().unwrap();
    assert_eq!(err.kind(), ErrorKind::BadPacket);
    assert!(err.to_string().contains("12 bytes"));
}

#[test]
fn blocking_reads_wait_for_data() {
    let (listener, uri) = relay();
    let mut trace = Trace::create(&uri).unwrap();
    let writer = thread::spawn(move || {
        let (mut server, _) = listener.accept().unwrap();
        let frames: Vec<_> = (0..3).map(|i| Frame::new(i, udp_frame(100 + i as u16, 8))).collect();
        for record in frames.iter().map(|f| erf_bytes(std::slice::from_ref(f))) {
            thread::sleep(Duration::from_millis(10));
            server.write_all(&record).unwrap();
        }
    });

    trace.config_str("filter=not src port 101").unwrap();
    trace.start().unwrap();
    let mut packet = Packet::new();
    let mut ports = Vec::new();
    while trace.read_packet(&mut packet).unwrap() > 0 {
        ports.extend(decode::source_port(&packet));
    }
    writer.join().unwrap();
    assert_eq!(ports, [100, 102]);
}

#[test]
fn relays_cannot_seek_or_be_written() {
    let (listener, uri) = relay();
    let mut trace = Trace::create(&uri).unwrap();
    let _server: TcpStream = listener.accept().unwrap().0;
    let err = trace.seek(SeekTarget::Seconds(1.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(
        tracekit_core::OutputTrace::create(&uri).unwrap_err().kind(),
        ErrorKind::BadFormat
    );
}

#[test]
fn unreachable_relay_fails_to_init() {
    let (listener, uri) = relay();
    drop(listener);
    assert_eq!(Trace::create(&uri).unwrap_err().kind(), ErrorKind::InitFailed);
}
