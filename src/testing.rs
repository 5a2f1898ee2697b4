// Styler Test Helpers
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::{Path, PathBuf};

/// Stand-in transcoder that copies its `-i` input onto its last argument.
pub const COPY_SCRIPT: &str = r#"in=""; prev=""; out=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then in="$a"; fi
  prev="$a"; out="$a"
done
cp "$in" "$out""#;

/// Write an executable shell script named `fake-ffmpeg.sh` into `dir`.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    fake_tool(dir, "fake-ffmpeg.sh", body)
}

/// Write an executable shell script `name` with `body` into `dir`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
