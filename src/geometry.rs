// Styler Target Geometry
// Copyright (c) 2026 Xing_The_Creator | SYNOID

/// Output width/height derived once from the probe frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetGeometry {
    pub width: u32,
    pub height: u32,
}

impl TargetGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Cap the longer side at `max_dimension` and scale the other side to keep
    /// the aspect ratio. `None` keeps the source size.
    pub fn resolve(width: u32, height: u32, max_dimension: Option<u32>) -> Self {
        let max = match max_dimension {
            Some(m) if m > 0 => m,
            _ => return Self::new(width, height),
        };

        if width > height {
            let scaled = (height as f64 * max as f64 / width as f64).round() as u32;
            Self::new(max, scaled.max(1))
        } else {
            let scaled = (width as f64 * max as f64 / height as f64).round() as u32;
            Self::new(scaled.max(1), max)
        }
    }

    pub fn same_as(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

impl std::fmt::Display for TargetGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
