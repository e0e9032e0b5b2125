//! Tests for the `regval` binary and the verify round trip.

mod common;

use std::fmt::Write as _;
use std::process::Command;

use common::{analyze, listing_file, ten_call_sites};
use regval::{AnalysisConfig, parse_observed, verify};

fn regval() -> Command {
    Command::new(env!("CARGO_BIN_EXE_regval"))
}

#[test]
fn test_observed_run_confirms_facts() {
    let (text, calls) = ten_call_sites();
    let analysis = analyze(&text, AnalysisConfig::default());

    let mut trace = String::new();
    for (k, addr) in (1..=10).zip(&calls) {
        writeln!(trace, "{addr:#x} r0 {k}").unwrap();
        // registers without facts are never contradicted
        writeln!(trace, "{addr:#x} r1 0xdead").unwrap();
    }
    let observed = parse_observed(&trace, &analysis.arch).unwrap();
    let result = verify(&analysis.report.facts, &observed);
    assert!(result.is_sound());
    assert_eq!(result.matched.len(), 10);
    assert_eq!(result.missing.len(), 10);

    let wrong = parse_observed(&format!("{:#x} r0 99\n", calls[0]), &analysis.arch).unwrap();
    let result = verify(&analysis.report.facts, &wrong);
    assert_eq!(result.mismatched.len(), 1);
    assert_eq!(result.mismatched[0].1.signed(), 1);
}

#[test]
fn test_analyze_prints_relation_rows() {
    let (text, calls) = ten_call_sites();
    let file = listing_file(&text);
    let output = regval()
        .args(["-s", "analyze"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let rows: Vec<&str> = stdout.lines().collect();
    assert_eq!(rows.len(), 10);
    assert_eq!(
        rows[0],
        format!("{:#x}\tr0\t{:#x}\tNONE\t0\t1", calls[0], calls[0])
    );
}

#[test]
fn test_verify_exit_codes() {
    let (text, calls) = ten_call_sites();
    let listing = listing_file(&text);

    let good = listing_file(&format!("{:x} r0 3\n", calls[2]));
    let status = regval()
        .args(["-s", "verify"])
        .arg(listing.path())
        .arg(good.path())
        .status()
        .unwrap();
    assert!(status.success());

    let bad = listing_file(&format!("{:x} r0 4\n", calls[2]));
    let status = regval()
        .args(["-s", "verify"])
        .arg(listing.path())
        .arg(bad.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_bad_listing_fails() {
    let file = listing_file("arch arm32\nblock orphan\n");
    let output = regval()
        .args(["-s", "analyze"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
