// Styler Resize Operation
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use image::imageops::{self, FilterType};

use super::OperationError;
use crate::geometry::TargetGeometry;
use crate::media::{Frame, PixelFormat};

/// Resample `frame` to `target`. The returned frame carries the new size.
pub fn apply(frame: &Frame, target: TargetGeometry) -> Result<Frame, OperationError> {
    if target.width == 0 || target.height == 0 {
        return Err(OperationError::InvalidGeometry(target));
    }
    if target.same_as(frame.width, frame.height) {
        return Ok(frame.clone());
    }

    match frame.format {
        PixelFormat::Rgb24 => {
            let rgb = frame
                .to_rgb_image()
                .ok_or_else(|| OperationError::malformed(frame))?;
            let resized = imageops::resize(&rgb, target.width, target.height, FilterType::Triangle);
            Ok(Frame::from_rgb_image(resized))
        }
        PixelFormat::Gray8 => {
            let gray = frame
                .to_gray_image()
                .ok_or_else(|| OperationError::malformed(frame))?;
            let resized = imageops::resize(&gray, target.width, target.height, FilterType::Triangle);
            Ok(Frame::from_gray_image(resized))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale_reports_new_size() {
        let frame = Frame::new(vec![128u8; 8 * 4 * 3], 8, 4, PixelFormat::Rgb24);
        let out = apply(&frame, TargetGeometry::new(4, 2)).unwrap();
        assert_eq!((out.width, out.height), (4, 2));
        assert!(out.is_well_formed());
        // Uniform input stays uniform.
        assert!(out.data.iter().all(|&p| p == 128));
    }

    #[test]
    fn test_gray_resize() {
        let frame = Frame::new(vec![50u8; 6 * 6], 6, 6, PixelFormat::Gray8);
        let out = apply(&frame, TargetGeometry::new(3, 3)).unwrap();
        assert_eq!(out.format, PixelFormat::Gray8);
        assert_eq!(out.data.len(), 9);
    }

    #[test]
    fn test_zero_target_rejected() {
        let frame = Frame::new(vec![0u8; 3], 1, 1, PixelFormat::Rgb24);
        assert!(apply(&frame, TargetGeometry::new(0, 1)).is_err());
    }
}
