// Styler Media Adapters
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod frame;
pub mod pipe;
pub mod probe;

pub use frame::{Frame, PixelFormat};
pub use pipe::{FfmpegReader, FfmpegWriter, WriterSpec};
pub use probe::{probe_video, VideoInfo};

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Sequential frame decoder consumed by the scheduler.
pub trait FrameSource: Send {
    /// Total frames in the stream, if known up front.
    fn frame_count(&self) -> Option<u64>;

    /// Next frame, or `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Sequential frame encoder, written only from the control thread.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the encoder.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Locations of the external ffmpeg tools.
#[derive(Debug, Clone)]
pub struct MediaTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for MediaTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Decode the first frame of `path`. Its geometry stands in for the whole video.
pub fn probe_frame(tools: &MediaTools, path: &Path) -> Result<Frame> {
    let mut reader = FfmpegReader::open(tools, path)?;
    match reader.read_frame()? {
        Some(frame) => Ok(frame),
        None => bail!("Invalid input source, could not find frame in {:?}", path),
    }
}
