// Exit codes of the `styler` binary for failures detected before any decoding.

use std::path::Path;
use std::process::{Command, Output};

fn styler(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_styler"))
        .current_dir(cwd)
        .env("STYLER_HWACCEL", "cpu")
        .env_remove("STYLER_TMP_DIR")
        .args(args)
        .output()
        .expect("Failed to run styler")
}

#[test]
fn test_too_few_arguments_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let out = styler(dir.path(), &["run", "input.mp4", "out"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn test_missing_input_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = styler(dir.path(), &["run", "does_not_exist.mp4", "out", "grayscale"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("out.mp4").exists());
}

#[test]
fn test_unknown_method_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.mp4"), b"x").unwrap();
    let out = styler(dir.path(), &["run", "in.mp4", "out", "sepia"]);
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn test_style_transfer_without_source_exits_five() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.mp4"), b"x").unwrap();
    let out = styler(
        dir.path(),
        &["run", "in.mp4", "out", "style-transfer", r#"{"frame_drop_rate": 0.1}"#],
    );
    assert_eq!(out.status.code(), Some(5));
    assert!(!dir.path().join("tmp").exists(), "no staging files may be created");
    assert!(!dir.path().join("out.mp4").exists());
}

#[test]
fn test_malformed_config_is_not_fatal() {
    // Falls back to defaults, then fails on the missing style source, not the JSON.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.mp4"), b"x").unwrap();
    let out = styler(dir.path(), &["run", "in.mp4", "out", "style-transfer", "{not json"]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn test_missing_output_directory_exits_seven() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.mp4"), b"x").unwrap();
    let out = styler(dir.path(), &["run", "in.mp4", "nowhere/out", "grayscale"]);
    assert_eq!(out.status.code(), Some(7));
}
