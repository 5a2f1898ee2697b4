// Styler Rawvideo Pipes
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Sequential frame decode/encode through ffmpeg child processes. Frames travel
// as packed rawvideo over stdin/stdout, so no codec bindings are linked.

use anyhow::{bail, Context, Result};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use super::frame::{Frame, PixelFormat};
use super::probe::{probe_video, VideoInfo};
use super::{FrameSink, FrameSource, MediaTools};

/// Decodes a video file into `Rgb24` frames, one `read_frame` at a time.
pub struct FfmpegReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: VideoInfo,
}

impl FfmpegReader {
    pub fn open(tools: &MediaTools, path: &Path) -> Result<Self> {
        let info = probe_video(&tools.ffprobe, path)?;

        let mut child = Command::new(&tools.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", PixelFormat::Rgb24.ffmpeg_name(), "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn ffmpeg reader. Is ffmpeg installed?")?;

        let stdout = match child.stdout.take() {
            Some(out) => out,
            None => bail!("ffmpeg reader has no stdout"),
        };

        debug!(
            "[MEDIA] Reader opened {:?} ({}x{} @ {})",
            path, info.width, info.height, info.frame_rate_raw
        );

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            info,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }
}

impl FrameSource for FfmpegReader {
    fn frame_count(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut buf = vec![0u8; PixelFormat::Rgb24.frame_len(self.info.width, self.info.height)];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => Ok(Some(Frame::new(
                buf,
                self.info.width,
                self.info.height,
                PixelFormat::Rgb24,
            ))),
            // A truncated trailing frame is treated as end of stream.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e).context("Failed reading frame from ffmpeg"),
        }
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        // The reader is often abandoned mid-stream (probe frame), so stop the decoder.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parameters of the intermediate file written by [`FfmpegWriter`].
#[derive(Debug, Clone)]
pub struct WriterSpec {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Frame rate in ffmpeg notation ("45", "30000/1001").
    pub frame_rate: String,
}

/// Encodes frames into the intermediate MPEG-4 (xvid) AVI.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    spec: WriterSpec,
    output: PathBuf,
}

impl FfmpegWriter {
    pub fn create(tools: &MediaTools, output: &Path, spec: WriterSpec) -> Result<Self> {
        let mut child = Command::new(&tools.ffmpeg)
            .args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", spec.format.ffmpeg_name()])
            .arg("-s")
            .arg(format!("{}x{}", spec.width, spec.height))
            .arg("-r")
            .arg(&spec.frame_rate)
            .args(["-i", "pipe:0", "-c:v", "mpeg4", "-vtag", "xvid", "-q:v", "3"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn ffmpeg writer. Is ffmpeg installed?")?;

        let stdin = match child.stdin.take() {
            Some(s) => s,
            None => bail!("ffmpeg writer has no stdin"),
        };

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            spec,
            output: output.to_path_buf(),
        })
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width != self.spec.width
            || frame.height != self.spec.height
            || frame.format != self.spec.format
        {
            bail!(
                "frame {}x{} {:?} does not match writer {}x{} {:?}",
                frame.width,
                frame.height,
                frame.format,
                self.spec.width,
                self.spec.height,
                self.spec.format
            );
        }
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(&frame.data).context("write failed"),
            None => bail!("writer already finished"),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                // The encoder stopped reading; reap it before reporting.
                let _ = self.child.kill();
                let _ = self.child.wait();
                return Err(e).context("flush failed");
            }
        }
        let status = self.child.wait().context("ffmpeg writer did not exit")?;
        if !status.success() {
            bail!("ffmpeg writer exited with {} for {:?}", status, self.output);
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            warn!("[MEDIA] Writer for {:?} dropped before finish", self.output);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
