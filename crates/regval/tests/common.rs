//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::io::Write;

use regval::{Analysis, AnalysisConfig, Pipeline};
use tempfile::NamedTempFile;

/// Write `text` to a temporary listing file.
pub fn listing_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp listing");
    file.write_all(text.as_bytes()).expect("write temp listing");
    file.flush().expect("flush temp listing");
    file
}

/// Analyze `text` through an on-disk listing.
pub fn analyze(text: &str, config: AnalysisConfig) -> Analysis {
    let file = listing_file(text);
    Pipeline::new(config)
        .run_file(file.path())
        .expect("listing analyzes")
}

/// `(address, register name, signed value)` for every fact.
pub fn facts(analysis: &Analysis) -> Vec<(u64, &'static str, i64)> {
    analysis
        .report
        .facts
        .iter()
        .map(|f| (f.address, analysis.arch.register_name(f.register), f.signed()))
        .collect()
}

pub const CALLER_BASE: u64 = 0x10400;
pub const CALLEE: u64 = 0x10600;

/// A caller with ten call sites, each preceded by `mov r0, #k` for k = 1..=10.
/// Returns the listing and the call instruction addresses.
pub fn ten_call_sites() -> (String, Vec<u64>) {
    let mut text = String::from("arch arm32\nfunction main\n");
    let mut calls = Vec::new();
    for k in 1..=10u64 {
        let base = CALLER_BASE + (k - 1) * 8;
        let entry = if k == 1 { " entry" } else { "" };
        writeln!(text, "block c{k}{entry}").unwrap();
        writeln!(text, "  {base:x} 4 mov r0, #{k}").unwrap();
        writeln!(text, "  {:x} 4 bl {CALLEE:x} <fun>", base + 4).unwrap();
        calls.push(base + 4);
    }
    let tail = CALLER_BASE + 80;
    writeln!(text, "block tail").unwrap();
    writeln!(text, "  {tail:x} 4 pop {{r4, pc}}").unwrap();
    writeln!(text, "function fun\nblock f0\n  {CALLEE:x} 4 bx lr").unwrap();
    for k in 1..=10 {
        let next = if k == 10 {
            "tail".to_string()
        } else {
            format!("c{}", k + 1)
        };
        writeln!(text, "edge c{k} {next} fallthrough").unwrap();
        writeln!(text, "edge c{k} f0 call").unwrap();
        writeln!(text, "edge f0 {next} return").unwrap();
    }
    (text, calls)
}
