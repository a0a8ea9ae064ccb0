//! Integration Test: UI Independence
//!
//! **Policy**: scribe-core is headless. It MUST NOT depend on or import any
//! terminal or GUI framework; hosts render events and frames themselves.

use architectural_enforcement::{rust_files, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm", "egui", "iced", "tauri"];

#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let manifest = std::fs::read_to_string(workspace_root().join("scribe/core/Cargo.toml"))
        .expect("core manifest readable");

    let found: Vec<&str> = UI_CRATES
        .iter()
        .copied()
        .filter(|name| manifest.lines().any(|l| l.trim_start().starts_with(name)))
        .collect();

    assert!(found.is_empty(), "scribe-core depends on UI crates: {found:?}");
}

#[test]
fn test_core_sources_import_no_ui_crates() {
    let mut violations = Vec::new();
    for file in rust_files("scribe/core/src") {
        let content = std::fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim_start();
            if UI_CRATES
                .iter()
                .any(|name| trimmed.starts_with(&format!("use {name}")))
            {
                violations.push(format!("{}:{} - {}", file.display(), idx + 1, trimmed));
            }
        }
    }

    assert!(violations.is_empty(), "UI imports in core: {violations:#?}");
}
