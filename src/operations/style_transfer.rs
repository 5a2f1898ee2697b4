// Styler Style Transfer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Statistics-based style transfer. The style image is reduced once to
// per-channel mean/deviation; each frame is then re-toned to match them.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;
use tracing::info;

use super::{resize, OperationError};
use crate::geometry::TargetGeometry;
use crate::media::{Frame, PixelFormat};

const MIN_DEVIATION: f32 = 1e-3;

/// Preprocessed style descriptor. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMatrix {
    mean: [f32; 3],
    deviation: [f32; 3],
}

impl StyleMatrix {
    /// Load `path` scaled so its longer side equals `max_dimension`.
    pub fn load(path: &Path, max_dimension: u32) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load style image {:?}", path))?
            .to_rgb8();

        let (w, h) = img.dimensions();
        let target = TargetGeometry::resolve(w, h, Some(max_dimension));
        let scaled = resize::apply(&Frame::from_rgb_image(img), target)
            .context("Failed to scale style image")?;
        let scaled = scaled
            .to_rgb_image()
            .context("Scaled style image is not RGB")?;

        let matrix = Self::from_image(&scaled);
        info!(
            "[STYLE] Loaded {:?} at {} (mean {:.1}/{:.1}/{:.1})",
            path, target, matrix.mean[0], matrix.mean[1], matrix.mean[2]
        );
        Ok(matrix)
    }

    pub fn from_image(img: &RgbImage) -> Self {
        let (mean, deviation) = channel_stats(img.as_raw());
        Self { mean, deviation }
    }

    /// Re-tone `frame` to the style's channel statistics. Geometry is preserved.
    pub fn stylize(&self, frame: &Frame) -> Result<Frame, OperationError> {
        if frame.format != PixelFormat::Rgb24 {
            return Err(OperationError::UnsupportedFormat {
                operation: "style-transfer",
                format: frame.format,
            });
        }
        if !frame.is_well_formed() {
            return Err(OperationError::malformed(frame));
        }

        let (mean, deviation) = channel_stats(&frame.data);
        let mut gain = [0f32; 3];
        for c in 0..3 {
            gain[c] = self.deviation[c] / deviation[c].max(MIN_DEVIATION);
        }

        let data = frame
            .data
            .chunks_exact(3)
            .flat_map(|px| {
                let mut out = [0u8; 3];
                for c in 0..3 {
                    let v = (px[c] as f32 - mean[c]) * gain[c] + self.mean[c];
                    out[c] = v.round().clamp(0.0, 255.0) as u8;
                }
                out
            })
            .collect();

        Ok(Frame::new(data, frame.width, frame.height, PixelFormat::Rgb24))
    }
}

/// Stylize a single still image and save it to `output`.
///
/// The content image is first capped at `max_dimension` when given. Returns the
/// dimensions of the written image.
pub fn stylize_image(
    content: &Path,
    style: &Path,
    output: &Path,
    max_style: u32,
    max_dimension: Option<u32>,
) -> Result<(u32, u32)> {
    let matrix = StyleMatrix::load(style, max_style)?;

    let img = image::open(content)
        .with_context(|| format!("Failed to load content image {:?}", content))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    let frame = resize::apply(
        &Frame::from_rgb_image(img),
        TargetGeometry::resolve(w, h, max_dimension),
    )
    .context("Failed to scale content image")?;

    let styled = matrix.stylize(&frame).context("Style transfer failed")?;
    let size = (styled.width, styled.height);
    styled
        .to_rgb_image()
        .context("Stylized image is not RGB")?
        .save(output)
        .with_context(|| format!("Failed to save {:?}", output))?;

    info!("[STYLE] Wrote {:?} ({}x{})", output, size.0, size.1);
    Ok(size)
}

fn channel_stats(data: &[u8]) -> ([f32; 3], [f32; 3]) {
    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];
    let mut n = 0f64;
    for px in data.chunks_exact(3) {
        for c in 0..3 {
            let v = px[c] as f64;
            sum[c] += v;
            sum_sq[c] += v * v;
        }
        n += 1.0;
    }
    if n == 0.0 {
        return ([0.0; 3], [0.0; 3]);
    }

    let mut mean = [0f32; 3];
    let mut deviation = [0f32; 3];
    for c in 0..3 {
        let m = sum[c] / n;
        mean[c] = m as f32;
        deviation[c] = (sum_sq[c] / n - m * m).max(0.0).sqrt() as f32;
    }
    (mean, deviation)
}
