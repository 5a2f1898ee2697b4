// Styler Frame Types
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use image::{GrayImage, RgbImage};

/// Packed pixel layouts exchanged with ffmpeg over rawvideo pipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Name understood by ffmpeg's `-pix_fmt`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Gray8 => "gray",
        }
    }

    pub fn frame_len(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/// A single decoded video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// True when the buffer length matches `width * height * bpp`.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.format.frame_len(self.width, self.height)
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        match self.format {
            PixelFormat::Rgb24 => RgbImage::from_raw(self.width, self.height, self.data.clone()),
            PixelFormat::Gray8 => None,
        }
    }

    pub fn to_gray_image(&self) -> Option<GrayImage> {
        match self.format {
            PixelFormat::Gray8 => GrayImage::from_raw(self.width, self.height, self.data.clone()),
            PixelFormat::Rgb24 => None,
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, PixelFormat::Rgb24)
    }

    pub fn from_gray_image(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, PixelFormat::Gray8)
    }
}
