//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Playback pacing is
//! expressed as a deadline in the driver's select loop, never as a sleep.
//! **Exceptions**: test code (`#[cfg(test)]` modules, `tests/` directories)

use architectural_enforcement::{all_production_lines, SourceLine};

fn is_sleep_call(line: &SourceLine) -> bool {
    line.code.contains("::sleep(") || line.code.contains(".sleep(")
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| is_sleep_call(line))
        .map(ToString::to_string)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use a deadline with tokio::time::sleep_until inside select! instead");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_no_thread_sleep_anywhere_in_core() {
    let offenders: Vec<String> = architectural_enforcement::rust_files("scribe/core/src")
        .into_iter()
        .filter(|file| {
            std::fs::read_to_string(file)
                .map(|c| c.contains("thread::sleep"))
                .unwrap_or(false)
        })
        .map(|file| file.display().to_string())
        .collect();

    assert!(
        offenders.is_empty(),
        "std::thread::sleep blocks the cooperative context: {offenders:?}"
    );
}

#[test]
fn test_sleep_detection() {
    let line = SourceLine {
        path: "x.rs".into(),
        number: 1,
        code: "    tokio::time::sleep(Duration::from_millis(10)).await;".into(),
        in_async_fn: true,
    };
    assert!(is_sleep_call(&line));

    let deadline = SourceLine {
        code: "    _ = tokio::time::sleep_until(deadline) => {}".into(),
        ..line
    };
    assert!(!is_sleep_call(&deadline));
}
