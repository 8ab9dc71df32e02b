use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;
use tracekit_core::{DeadTrace, LinkType, OutputTrace, Timestamp};

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tracekit"))
}

/// Ethernet + IPv4 frame carrying a UDP (17) or TCP (6) header.
fn frame(protocol: u8, dst_port: u16) -> Vec<u8> {
    let l4_len = if protocol == 6 { 20 } else { 8 };
    let mut data = vec![0u8; 14 + 20 + l4_len + 16];
    data[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    let ip = &mut data[14..34];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&((20 + l4_len + 16) as u16).to_be_bytes());
    ip[8] = 64;
    ip[9] = protocol;
    ip[12..16].copy_from_slice(&[192, 168, 1, 1]);
    ip[16..20].copy_from_slice(&[192, 168, 1, 2]);
    let l4 = &mut data[34..];
    l4[0..2].copy_from_slice(&40_000u16.to_be_bytes());
    l4[2..4].copy_from_slice(&dst_port.to_be_bytes());
    if protocol == 6 {
        l4[12] = 5 << 4;
    } else {
        l4[4..6].copy_from_slice(&24u16.to_be_bytes());
    }
    data
}

/// Three UDP packets to port 53 and one TCP packet to port 443.
fn write_fixture(dir: &Path, uri_format: &str, name: &str) -> String {
    let uri = format!("{uri_format}:{}", dir.join(name).display());
    let dead = DeadTrace::create(&format!("{uri_format}:")).unwrap();
    let mut out = OutputTrace::create(&uri).unwrap();
    out.start().unwrap();
    for (i, (protocol, port)) in [(17, 53), (6, 443), (17, 53), (17, 53)].into_iter().enumerate() {
        let ts = Timestamp::from_parts(1_700_000_000 + i as u32, 0);
        let packet = dead.build_packet(LinkType::Ethernet, ts, &frame(protocol, port)).unwrap();
        out.write_packet(&packet).unwrap();
    }
    out.destroy().unwrap();
    uri
}

fn info_json(args: &[&str]) -> Value {
    let assert = cmd().arg("info").args(args).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("info").and(contains("copy")).and(contains("formats")));
    cmd().arg("copy").arg("--help").assert().success();
}

#[test]
fn formats_lists_builtin_providers() {
    cmd()
        .arg("formats")
        .assert()
        .success()
        .stdout(contains("pcapfile").and(contains("erf")).and(contains("rtclient")));
}

#[test]
fn info_reports_counts_and_timestamps() {
    let temp = TempDir::new().expect("tempdir");
    let uri = write_fixture(temp.path(), "pcapfile", "dns.pcap");
    let report = info_json(&[&uri]);

    assert_eq!(report["report_version"], 1);
    let trace = &report["traces"][0];
    assert_eq!(trace["format"], "pcapfile");
    assert_eq!(trace["packets"], 4);
    assert_eq!(trace["transports"]["udp"], 3);
    assert_eq!(trace["transports"]["tcp"], 1);
    assert_eq!(trace["link_types"]["ethernet"], 4);
    assert_eq!(trace["first_timestamp"], "2023-11-14T22:13:20Z");
    assert_eq!(trace["duration_seconds"], 3.0);
}

#[test]
fn info_applies_filter_and_snaplen() {
    let temp = TempDir::new().expect("tempdir");
    let uri = write_fixture(temp.path(), "erf", "dns.erf");
    let report = info_json(&[&uri, "--filter", "udp port 53", "--snaplen", "40", "--pretty"]);
    let trace = &report["traces"][0];
    assert_eq!(trace["packets"], 3);
    assert_eq!(trace["captured_bytes"], 120);
}

#[test]
fn info_expands_globs() {
    let temp = TempDir::new().expect("tempdir");
    write_fixture(temp.path(), "pcapfile", "a.pcap");
    write_fixture(temp.path(), "pcapfile", "b.pcap");
    let pattern = format!("pcapfile:{}/*.pcap", temp.path().display());
    let report = info_json(&[&pattern]);
    assert_eq!(report["traces"].as_array().unwrap().len(), 2);
}

#[test]
fn bad_filter_shows_error() {
    let temp = TempDir::new().expect("tempdir");
    let uri = write_fixture(temp.path(), "pcapfile", "dns.pcap");
    cmd()
        .args(["info", &uri, "--filter", "port"])
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("filter")));
}

#[test]
fn promisc_on_a_file_is_unavailable() {
    let temp = TempDir::new().expect("tempdir");
    let uri = write_fixture(temp.path(), "pcapfile", "dns.pcap");
    cmd()
        .args(["info", &uri, "--promisc"])
        .assert()
        .code(2)
        .stderr(contains("promisc").and(contains("hint:")));
}

#[test]
fn unknown_format_shows_error_and_hint() {
    cmd()
        .args(["info", "bogus:whatever"])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = format!("pcapfile:{}", temp.path().join("missing.pcap").display());
    cmd()
        .args(["info", &missing])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn copy_converts_between_formats() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_fixture(temp.path(), "pcapfile", "in.pcap");
    let output = format!("erf:{}", temp.path().join("out.erf.gz").display());

    cmd()
        .args(["copy", &input, &output, "--filter", "tcp", "--compress", "6"])
        .assert()
        .success()
        .stderr(contains("OK: 1 packets written"));

    let bytes = std::fs::read(temp.path().join("out.erf.gz")).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    let report = info_json(&[&output]);
    assert_eq!(report["traces"][0]["packets"], 1);
    assert_eq!(report["traces"][0]["transports"]["tcp"], 1);
}

#[test]
fn copy_appends_and_limits() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_fixture(temp.path(), "erf", "in.erf");
    let output = format!("pcapfile:{}", temp.path().join("out.pcap").display());

    cmd().args(["copy", &input, &output, "--quiet"]).assert().success().stderr("");
    cmd()
        .args(["copy", &input, &output, "--append", "-c", "2", "--quiet"])
        .assert()
        .success();
    assert_eq!(info_json(&[&output])["traces"][0]["packets"], 6);
}

#[test]
fn copy_rejects_bad_options() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_fixture(temp.path(), "pcapfile", "in.pcap");
    let output = format!("erf:{}", temp.path().join("out.erf").display());
    cmd()
        .args(["copy", &input, &output, "--compress", "12"])
        .assert()
        .code(2)
        .stderr(contains("compression level 12"));
    cmd()
        .args(["copy", &input, &output, "-O", "colour=blue"])
        .assert()
        .code(2)
        .stderr(contains("error:"));
    cmd()
        .args(["copy", &input, "rtclient:localhost"])
        .assert()
        .code(2)
        .stderr(contains("cannot be written"));
}
