// Styler Transcoder
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// ffmpeg invocations at the two stage boundaries: resize + frame-rate
// reduction before processing, and the distribution re-encode after it.
// Every call honours an optional timeout and the pipeline's cancellation token.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Stage};
use crate::geometry::TargetGeometry;
use crate::hw_accel::HwProfile;

/// One transcoder call.
#[derive(Debug, Clone)]
pub struct TranscodeRequest<'a> {
    pub stage: Stage,
    pub input: &'a Path,
    pub output: &'a Path,
    /// Resize target (staging only).
    pub geometry: Option<TargetGeometry>,
    /// Output frame rate (staging only).
    pub frame_rate: Option<u32>,
}

pub struct Transcoder {
    ffmpeg: PathBuf,
    hw: HwProfile,
    timeout: Option<Duration>,
    retries: u32,
    cancel: CancellationToken,
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, hw: HwProfile, cancel: CancellationToken) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            hw,
            timeout: None,
            retries: 0,
            cancel,
        }
    }

    /// `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn build_args(&self, req: &TranscodeRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-nostdin", "-v", "error"]
            .iter()
            .map(OsString::from)
            .collect();

        match req.stage {
            Stage::Staging => {
                args.push("-i".into());
                args.push(req.input.into());

                let mut filters = Vec::new();
                if let Some(g) = req.geometry {
                    filters.push(format!("scale={}:{}", g.width, g.height));
                }
                if let Some(rate) = req.frame_rate {
                    filters.push(format!("fps={}", rate));
                }
                if !filters.is_empty() {
                    args.push("-vf".into());
                    args.push(filters.join(",").into());
                }
                // Audio never reaches the processed stream, so drop it here.
                for a in ["-c:v", "mpeg4", "-vtag", "xvid", "-q:v", "3", "-an"] {
                    args.push(a.into());
                }
            }
            _ => {
                if let Some(hwaccel) = self.hw.ffmpeg_hwaccel() {
                    args.push("-hwaccel".into());
                    args.push(hwaccel.into());
                }
                args.push("-i".into());
                args.push(req.input.into());
                // yuv420p needs even dimensions.
                for a in [
                    "-vf",
                    "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                    "-c:v",
                    "libx264",
                    "-pix_fmt",
                    "yuv420p",
                    "-movflags",
                    "+faststart",
                ] {
                    args.push(a.into());
                }
            }
        }

        args.push(req.output.into());
        args
    }

    /// Run the request, retrying up to the configured count.
    pub async fn run(&self, req: &TranscodeRequest<'_>) -> Result<(), PipelineError> {
        let mut attempt = 0;
        loop {
            match self.run_once(req).await {
                Ok(()) => return Ok(()),
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "[TRANSCODE] {} attempt {} failed ({}), retrying",
                        req.stage, attempt, e
                    );
                    let _ = std::fs::remove_file(req.output);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_once(&self, req: &TranscodeRequest<'_>) -> Result<(), PipelineError> {
        let stage = req.stage;
        let fail = |reason: String| PipelineError::Transcode { stage, reason };

        let args = self.build_args(req);
        debug!("[TRANSCODE] {:?} {:?}", self.ffmpeg, args);
        info!("[TRANSCODE] {} {:?} → {:?}", stage, req.input, req.output);

        let child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fail(format!("failed to spawn {:?}: {}", self.ffmpeg, e)))?;

        let waited = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                    .await
                    .map_err(|_| format!("timed out after {:?}", limit)),
                None => Ok(child.wait_with_output().await),
            }
        };

        // Dropping `waited` on cancellation drops the child, which kills it.
        let output = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = waited => result,
        };

        let output = output.map_err(fail)?.map_err(|e| fail(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("ffmpeg exited with {}: {}", output.status, stderr.trim())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use crate::testing::fake_ffmpeg;

    fn transcoder(ffmpeg: &Path) -> Transcoder {
        Transcoder::new(ffmpeg, HwProfile::Cpu { threads: 1 }, CancellationToken::new())
    }

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_staging_args_resize_and_rate() {
        let t = transcoder(Path::new("ffmpeg"));
        let req = TranscodeRequest {
            stage: Stage::Staging,
            input: Path::new("in.mp4"),
            output: Path::new("tmp/out.staged.avi"),
            geometry: Some(TargetGeometry::new(480, 270)),
            frame_rate: Some(45),
        };
        let args = args_as_strings(t.build_args(&req));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=480:270,fps=45");
        assert_eq!(args.last().unwrap(), "tmp/out.staged.avi");
        assert!(!args.contains(&"-hwaccel".to_string()));
    }

    #[test]
    fn test_finalize_args_use_hwaccel_when_available() {
        let t = Transcoder::new(
            "ffmpeg",
            HwProfile::Cuda {
                name: "GPU".into(),
                driver_version: "1".into(),
            },
            CancellationToken::new(),
        );
        let req = TranscodeRequest {
            stage: Stage::Finalizing,
            input: Path::new("tmp/a.processed.avi"),
            output: Path::new("tmp/a.finalized.mp4"),
            geometry: None,
            frame_rate: None,
        };
        let args = args_as_strings(t.build_args(&req));
        let hw = args.iter().position(|a| a == "-hwaccel").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[hw + 1], "cuda");
        assert!(hw < input, "-hwaccel must precede the input");
        assert!(args.contains(&"libx264".to_string()));
    }

    #[cfg(unix)]
    fn finalize_req(dir: &Path) -> (PathBuf, PathBuf) {
        (dir.join("in.avi"), dir.join("out.mp4"))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_names_stage() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo boom >&2; exit 1");
        let (input, output) = finalize_req(dir.path());
        let req = TranscodeRequest {
            stage: Stage::Finalizing,
            input: &input,
            output: &output,
            geometry: None,
            frame_rate: None,
        };
        let err = transcoder(&ffmpeg).run(&req).await.unwrap_err();
        match err {
            PipelineError::Transcode { stage, reason } => {
                assert_eq!(stage, Stage::Finalizing);
                assert!(reason.contains("boom"), "reason was {}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_hung_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "sleep 30");
        let (input, output) = finalize_req(dir.path());
        let req = TranscodeRequest {
            stage: Stage::Staging,
            input: &input,
            output: &output,
            geometry: None,
            frame_rate: None,
        };
        let t = transcoder(&ffmpeg).with_timeout(Some(Duration::from_millis(200)));
        let err = t.run(&req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcode { stage: Stage::Staging, ref reason } if reason.contains("timed out")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_stops_wait() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "sleep 30");
        let (input, output) = finalize_req(dir.path());
        let cancel = CancellationToken::new();
        let t = Transcoder::new(&ffmpeg, HwProfile::Cpu { threads: 1 }, cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let req = TranscodeRequest {
            stage: Stage::Finalizing,
            input: &input,
            output: &output,
            geometry: None,
            frame_rate: None,
        };
        assert!(matches!(t.run(&req).await, Err(PipelineError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_retries_reinvoke_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("calls.txt");
        let ffmpeg = fake_ffmpeg(dir.path(), &format!("echo x >> '{}'; exit 1", counter.display()));
        let (input, output) = finalize_req(dir.path());
        let req = TranscodeRequest {
            stage: Stage::Finalizing,
            input: &input,
            output: &output,
            geometry: None,
            frame_rate: None,
        };
        let result = transcoder(&ffmpeg).with_retries(2).run(&req).await;
        assert!(result.is_err());
        let calls = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(calls.lines().count(), 3);
    }
}
