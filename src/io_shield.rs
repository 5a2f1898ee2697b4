// Styler I/O Shield: Atomic Publish
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The finalized render lives in the tmp directory until it is complete; only
// then is it moved onto the requested output path. A crash before the move
// leaves the destination untouched.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

pub struct AtomicMover;

impl AtomicMover {
    /// Move a completed temp file onto `final_path`, replacing any existing file.
    ///
    /// * Same filesystem → `fs::rename` (atomic, zero-copy).
    /// * Cross-filesystem → `fs::copy` + `fs::remove_file` (fallback).
    pub fn commit(temp_path: &Path, final_path: &Path) -> io::Result<()> {
        if !temp_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source temp file missing: {:?}", temp_path),
            ));
        }

        if final_path.exists() {
            info!("[IO_SHIELD] Found output file with same name, removing {:?}", final_path);
            fs::remove_file(final_path)?;
        }

        match fs::rename(temp_path, final_path) {
            Ok(()) => {
                info!("[IO_SHIELD] ✅ Atomic rename: {:?} → {:?}", temp_path, final_path);
                Ok(())
            }
            Err(rename_err) => {
                warn!(
                    "[IO_SHIELD] Rename failed ({}). Falling back to copy-delete.",
                    rename_err
                );
                if let Err(e) = fs::copy(temp_path, final_path) {
                    // Never leave a half-copied output behind.
                    let _ = fs::remove_file(final_path);
                    return Err(e);
                }
                fs::remove_file(temp_path)?;
                info!(
                    "[IO_SHIELD] ✅ Cross-device move complete: {:?} → {:?}",
                    temp_path, final_path
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_commit_replaces_existing_output() {
        let tmp = PathBuf::from("__test_io_shield_src.tmp");
        let dest = PathBuf::from("__test_io_shield_dst.mp4");
        let _ = fs::remove_file(&tmp);
        let _ = fs::remove_file(&dest);

        fs::write(&dest, b"stale render").unwrap();
        fs::write(&tmp, b"fresh render").unwrap();

        AtomicMover::commit(&tmp, &dest).unwrap();

        assert!(!tmp.exists(), "Source should be gone after rename");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "fresh render");

        let _ = fs::remove_file(&dest);
    }

    #[test]
    fn test_commit_missing_source() {
        let result = AtomicMover::commit(
            Path::new("__nonexistent_file_xyz.tmp"),
            Path::new("__dest_never_written.mp4"),
        );
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(!Path::new("__dest_never_written.mp4").exists());
    }
}
