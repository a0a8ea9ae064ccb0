//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions MUST NOT use blocking I/O.
//! **Required**: `tokio::fs` inside async code (the ledger storage does this).
//! **Acceptable**: blocking I/O in non-async functions, such as configuration
//! loading before the runtime starts, and test code.

use architectural_enforcement::{all_production_lines, production_lines, rust_files, SourceLine};

const BLOCKING_PATTERNS: &[&str] = &[
    "std::fs::",
    "std::net::",
    "std::process::Command",
    "std::io::stdin",
];

fn is_blocking_in_async(line: &SourceLine) -> bool {
    line.in_async_fn && BLOCKING_PATTERNS.iter().any(|p| line.code.contains(p))
}

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| is_blocking_in_async(line))
        .map(ToString::to_string)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O found inside async functions!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - or move the call into a non-async helper run before the runtime");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// The binary runs everything on the runtime, so even its sync helpers
/// end up called from async code.
#[test]
fn test_cli_uses_async_file_io() {
    let violations: Vec<String> = rust_files("scribe/cli/src")
        .iter()
        .flat_map(|file| production_lines(file))
        .filter(|line| BLOCKING_PATTERNS.iter().any(|p| line.code.contains(p)))
        .map(|line| line.to_string())
        .collect();

    assert!(
        violations.is_empty(),
        "blocking I/O in the CLI:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_blocking_detection() {
    let line = SourceLine {
        path: "x.rs".into(),
        number: 3,
        code: "    let s = std::fs::read_to_string(p)?;".into(),
        in_async_fn: true,
    };
    assert!(is_blocking_in_async(&line));

    let sync = SourceLine {
        in_async_fn: false,
        ..line
    };
    assert!(!is_blocking_in_async(&sync));
}
