/*!
 * Integration tests for the ctxscan binary
 */

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn ctxscan(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ctxscan"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn setup(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("README.md"), "# readme\n").unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "x\n").unwrap();
}

#[test]
fn test_tree_mode_prints_tree() {
    let dir = tempdir().unwrap();
    setup(dir.path());

    let out = ctxscan(&["--mode", "tree", "--config", "none.json", "."], dir.path());
    // The explicit config file does not exist
    assert!(!out.status.success());

    fs::write(dir.path().join("cfg.json"), r#"{"ignore_patterns": ["*.json"]}"#).unwrap();
    let out = ctxscan(&["--mode", "tree", "--config", "cfg.json", "."], dir.path());
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("src/"));
    assert!(stdout.contains("main.rs"));
    assert!(stdout.contains("README.md"));
    assert!(!stdout.contains("node_modules"));
    assert!(!stdout.contains("cfg.json"));
}

#[test]
fn test_files_mode_applies_excludes() {
    let dir = tempdir().unwrap();
    setup(dir.path());
    fs::write(dir.path().join("cfg.json"), "{}").unwrap();

    let out = ctxscan(
        &["--mode", "files", "--config", "cfg.json", "--exclude", "*.md,*.json", "."],
        dir.path(),
    );
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("main.rs"));
}

#[test]
fn test_context_mode_writes_document() {
    let dir = tempdir().unwrap();
    setup(dir.path());
    fs::write(dir.path().join("cfg.json"), "{}").unwrap();

    let out = ctxscan(&["--config", "cfg.json", "."], dir.path());
    assert!(out.status.success());

    let xml = fs::read_to_string(dir.path().join(".ctxscan.context.xml")).unwrap();
    assert!(xml.contains("<context"));
    assert!(xml.contains("<file path=\"src/main.rs\""));
    assert!(xml.contains("fn main() {}"));
    assert!(!xml.contains("index.js"));
}

#[test]
fn test_missing_root_fails() {
    let dir = tempdir().unwrap();
    let out = ctxscan(&["--mode", "tree", "does-not-exist"], dir.path());
    assert!(!out.status.success());
}
