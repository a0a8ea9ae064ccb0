//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! of the scribe workspace:
//! - No sleep() calls in production code (playback timing goes through the driver's deadline)
//! - No blocking I/O inside async functions
//! - The core crate stays free of UI frameworks
//!
//! The helpers here locate workspace sources and strip test code so each rule
//! only sees production lines.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories checked by every rule
pub const PRODUCTION_DIRS: &[&str] = &["scribe/core/src", "scribe/cli/src"];

/// One production line of a source file
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Line text with any `//` comment removed
    pub code: String,
    /// Whether the line sits inside an `async fn`
    pub in_async_fn: bool,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Workspace root, two levels above this crate
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files below `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Production lines of a file: comments stripped, `#[cfg(test)]` modules dropped
#[must_use]
pub fn production_lines(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    production_lines_of(path, &content)
}

/// Same as [`production_lines`] for already-loaded content
#[must_use]
pub fn production_lines_of(path: &Path, content: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut in_async_fn = false;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();

        // Test modules sit at the bottom of each file
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        if let Some(signature) = fn_signature(trimmed) {
            in_async_fn = signature.contains("async fn ");
        }

        let code = line.split("//").next().unwrap_or(line).to_string();
        lines.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code,
            in_async_fn,
        });
    }
    lines
}

/// Return the line if it starts a function definition
fn fn_signature(trimmed: &str) -> Option<&str> {
    let rest = trimmed
        .strip_prefix("pub(crate) ")
        .or_else(|| trimmed.strip_prefix("pub "))
        .unwrap_or(trimmed);
    (rest.starts_with("fn ") || rest.starts_with("async fn ")).then_some(rest)
}

/// Every production line across [`PRODUCTION_DIRS`]
#[must_use]
pub fn all_production_lines() -> Vec<SourceLine> {
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_files(dir))
        .flat_map(|file| production_lines(&file))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_modules_are_skipped() {
        let code = "fn a() {}\n#[cfg(test)]\nmod tests {\n    fn b() { std::thread::sleep(d); }\n}\n";
        let lines = production_lines_of(Path::new("x.rs"), code);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_async_fn_tracking() {
        let code = "async fn run() {\n    work();\n}\nfn sync() {\n    other();\n}\n";
        let lines = production_lines_of(Path::new("x.rs"), code);
        assert!(lines[1].in_async_fn);
        assert!(!lines[4].in_async_fn);
    }

    #[test]
    fn test_comments_stripped() {
        let lines = production_lines_of(Path::new("x.rs"), "let a = 1; // std::fs::read\n");
        assert!(!lines[0].code.contains("std::fs"));
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("scribe/core/Cargo.toml").exists());
    }
}
