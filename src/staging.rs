// Styler Staging Lifecycle
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// RawInput → Staged → Processed → Finalized → Published, with Failed reachable
// from anywhere. Each transition deletes the owned artifact it supersedes; the
// raw input is never owned and never deleted.

use anyhow::anyhow;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Stage};
use crate::geometry::TargetGeometry;
use crate::io_shield::AtomicMover;
use crate::transcoder::{TranscodeRequest, Transcoder};

/// Frame rate the drop rate is applied against.
pub const BASE_FRAME_RATE: u32 = 60;

pub const OUTPUT_EXTENSION: &str = "mp4";

/// `floor(60 * (1 - drop_rate))`, never below 1 fps.
pub fn reduced_frame_rate(frame_drop_rate: f64) -> u32 {
    // The epsilon keeps products like 60 * 0.85 from flooring one frame low.
    let kept = BASE_FRAME_RATE as f64 * (1.0 - frame_drop_rate) + 1e-9;
    (kept.floor() as u32).max(1)
}

/// Where the finished render lands: the output path with `.mp4` appended
/// unless it already carries that extension.
pub fn published_path(output: &Path) -> PathBuf {
    let has_ext = output
        .extension()
        .map(|e| e.eq_ignore_ascii_case(OUTPUT_EXTENSION))
        .unwrap_or(false);
    if has_ext {
        return output.to_path_buf();
    }
    let mut name = OsString::from(output.as_os_str());
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    RawInput,
    Staged,
    Processed,
    Finalized,
    Published,
    Failed,
}

pub struct StagingFile {
    state: StagingState,
    raw_input: PathBuf,
    staged: PathBuf,
    staged_owned: bool,
    processed: PathBuf,
    finalized: PathBuf,
    published: PathBuf,
}

impl StagingFile {
    /// Artifact names derive from the output basename.
    pub fn new(tmp_dir: &Path, raw_input: &Path, output: &Path) -> Self {
        let base = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        Self {
            state: StagingState::RawInput,
            raw_input: raw_input.to_path_buf(),
            staged: tmp_dir.join(format!("{}.staged.avi", base)),
            staged_owned: true,
            processed: tmp_dir.join(format!("{}.processed.avi", base)),
            finalized: tmp_dir.join(format!("{}.finalized.mp4", base)),
            published: published_path(output),
        }
    }

    pub fn state(&self) -> StagingState {
        self.state
    }

    /// The file the scheduler decodes from. Equals the raw input on pass-through.
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    /// The file the scheduler's writer must produce.
    pub fn processed_path(&self) -> &Path {
        &self.processed
    }

    pub fn finalized_path(&self) -> &Path {
        &self.finalized
    }

    pub fn published_path(&self) -> &Path {
        &self.published
    }

    /// Delete leftovers from an earlier run that used the same output name.
    pub fn remove_stale(&self) -> io::Result<()> {
        for path in [&self.staged, &self.processed, &self.finalized] {
            if path.exists() && path != &self.raw_input {
                info!("[STAGING] Removing stale artifact {:?}", path);
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Resize and drop frames in one transcoder pass. `frame_drop_rate` is
    /// `None` when no frames are dropped. Skipped (pass-through) when the
    /// geometry is unchanged and nothing is dropped.
    pub async fn stage(
        &mut self,
        transcoder: &Transcoder,
        source: (u32, u32),
        geometry: TargetGeometry,
        frame_drop_rate: Option<f64>,
    ) -> Result<(), PipelineError> {
        self.require(StagingState::RawInput, Stage::Staging)?;

        let resize = !geometry.same_as(source.0, source.1);
        let rate = frame_drop_rate.map(reduced_frame_rate);

        if !resize && rate.is_none() {
            info!("[STAGING] No resize or frame drop requested, using raw input as staged");
            self.staged = self.raw_input.clone();
            self.staged_owned = false;
            self.state = StagingState::Staged;
            return Ok(());
        }

        info!(
            "[STAGING] Pre-processing to {}{}",
            geometry,
            rate.map(|r| format!(" @ {} fps", r)).unwrap_or_default()
        );

        let request = TranscodeRequest {
            stage: Stage::Staging,
            input: &self.raw_input,
            output: &self.staged,
            geometry: resize.then_some(geometry),
            frame_rate: rate,
        };
        transcoder.run(&request).await?;

        ensure_artifact(Stage::Staging, &self.staged)?;
        self.state = StagingState::Staged;
        Ok(())
    }

    /// The scheduler has written the processed file; the staged copy is no
    /// longer needed.
    pub fn mark_processed(&mut self) -> Result<(), PipelineError> {
        self.require(StagingState::Staged, Stage::Processing)?;
        ensure_artifact(Stage::Processing, &self.processed)?;
        if self.staged_owned {
            remove_artifact(&self.staged);
        }
        self.state = StagingState::Processed;
        Ok(())
    }

    /// Re-encode the processed file for distribution.
    pub async fn finalize(&mut self, transcoder: &Transcoder) -> Result<(), PipelineError> {
        self.require(StagingState::Processed, Stage::Finalizing)?;

        let request = TranscodeRequest {
            stage: Stage::Finalizing,
            input: &self.processed,
            output: &self.finalized,
            geometry: None,
            frame_rate: None,
        };
        transcoder.run(&request).await?;

        ensure_artifact(Stage::Finalizing, &self.finalized)?;
        remove_artifact(&self.processed);
        self.state = StagingState::Finalized;
        Ok(())
    }

    /// Move the finalized file onto the published path.
    pub fn publish(&mut self) -> Result<PathBuf, PipelineError> {
        self.require(StagingState::Finalized, Stage::Publishing)?;

        AtomicMover::commit(&self.finalized, &self.published).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PipelineError::MissingArtifact {
                    stage: Stage::Publishing,
                    path: self.finalized.clone(),
                }
            } else {
                PipelineError::Io(e)
            }
        })?;

        self.state = StagingState::Published;
        info!("[STAGING] Published {:?}", self.published);
        Ok(self.published.clone())
    }

    /// Delete every owned artifact and enter `Failed`.
    pub fn fail(&mut self) {
        if matches!(self.state, StagingState::Published | StagingState::Failed) {
            return;
        }
        warn!("[STAGING] Cleaning up after failure in state {:?}", self.state);
        if self.staged_owned {
            remove_artifact(&self.staged);
        }
        remove_artifact(&self.processed);
        remove_artifact(&self.finalized);
        self.state = StagingState::Failed;
    }

    fn require(&self, expected: StagingState, stage: Stage) -> Result<(), PipelineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PipelineError::Media(anyhow!(
                "{} requested in state {:?} (expected {:?})",
                stage,
                self.state,
                expected
            )))
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        self.fail();
    }
}

fn ensure_artifact(stage: Stage, path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact {
            stage,
            path: path.to_path_buf(),
        })
    }
}

fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("[STAGING] Removed {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("[STAGING] Could not remove {:?}: {}", path, e),
    }
}
