// Styler Grayscale Operation
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use image::imageops;

use super::OperationError;
use crate::media::{Frame, PixelFormat};

/// Collapse an RGB frame to a single luma channel. Gray input passes through.
pub fn apply(frame: &Frame) -> Result<Frame, OperationError> {
    match frame.format {
        PixelFormat::Gray8 => Ok(frame.clone()),
        PixelFormat::Rgb24 => {
            let rgb = frame
                .to_rgb_image()
                .ok_or_else(|| OperationError::malformed(frame))?;
            Ok(Frame::from_gray_image(imageops::grayscale(&rgb)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_channel_output() {
        let frame = Frame::new(vec![255, 255, 255, 0, 0, 0], 2, 1, PixelFormat::Rgb24);
        let gray = apply(&frame).unwrap();
        assert_eq!(gray.format, PixelFormat::Gray8);
        assert_eq!((gray.width, gray.height), (2, 1));
        assert_eq!(gray.data, vec![255, 0]);
    }

    #[test]
    fn test_gray_input_is_unchanged() {
        let frame = Frame::new(vec![10, 20, 30, 40], 2, 2, PixelFormat::Gray8);
        assert_eq!(apply(&frame).unwrap(), frame);
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let frame = Frame::new(vec![1, 2, 3], 2, 1, PixelFormat::Rgb24);
        assert!(matches!(apply(&frame), Err(OperationError::MalformedFrame { .. })));
    }
}
