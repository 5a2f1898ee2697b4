// Styler Operation Dispatcher
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Routes a frame to one of the supported transforms. No business logic lives
// here beyond picking the variant.

pub mod grayscale;
pub mod resize;
pub mod style_transfer;

pub use style_transfer::StyleMatrix;

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::error::PipelineError;
use crate::geometry::TargetGeometry;
use crate::media::{Frame, PixelFormat};

pub const METHOD_GRAYSCALE: &str = "grayscale";
pub const METHOD_STYLE_TRANSFER: &str = "style-transfer";

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("frame buffer of {len} bytes does not match {width}x{height} {format:?}")]
    MalformedFrame {
        len: usize,
        width: u32,
        height: u32,
        format: PixelFormat,
    },

    #[error("{operation} does not accept {format:?} frames")]
    UnsupportedFormat {
        operation: &'static str,
        format: PixelFormat,
    },

    #[error("invalid resize target {0}")]
    InvalidGeometry(TargetGeometry),

    #[error("{0}")]
    Failed(String),
}

impl OperationError {
    pub fn malformed(frame: &Frame) -> Self {
        OperationError::MalformedFrame {
            len: frame.data.len(),
            width: frame.width,
            height: frame.height,
            format: frame.format,
        }
    }
}

/// Processing methods selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Grayscale,
    StyleTransfer,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Grayscale => METHOD_GRAYSCALE,
            Method::StyleTransfer => METHOD_STYLE_TRANSFER,
        }
    }

    /// Pixel format the method's frames are written in.
    pub fn output_format(&self) -> PixelFormat {
        match self {
            Method::Grayscale => PixelFormat::Gray8,
            Method::StyleTransfer => PixelFormat::Rgb24,
        }
    }
}

impl FromStr for Method {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            METHOD_GRAYSCALE => Ok(Method::Grayscale),
            METHOD_STYLE_TRANSFER => Ok(Method::StyleTransfer),
            other => Err(PipelineError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-frame transform the scheduler can fan out across workers.
pub trait FrameOperation: Send + Sync {
    fn apply(&self, frame: &Frame) -> Result<Frame, OperationError>;
}

/// The closed set of transforms.
#[derive(Debug, Clone)]
pub enum Operation {
    Grayscale,
    Resize(TargetGeometry),
    StyleTransfer(Arc<StyleMatrix>),
}

impl Operation {
    /// Build the operation for a method. Style transfer needs its loaded matrix.
    pub fn for_method(
        method: Method,
        style: Option<Arc<StyleMatrix>>,
    ) -> Result<Self, PipelineError> {
        match method {
            Method::Grayscale => Ok(Operation::Grayscale),
            Method::StyleTransfer => style
                .map(Operation::StyleTransfer)
                .ok_or(PipelineError::MissingStyleSource),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Grayscale => METHOD_GRAYSCALE,
            Operation::Resize(_) => "resize",
            Operation::StyleTransfer(_) => METHOD_STYLE_TRANSFER,
        }
    }
}

impl FrameOperation for Operation {
    fn apply(&self, frame: &Frame) -> Result<Frame, OperationError> {
        match self {
            Operation::Grayscale => grayscale::apply(frame),
            Operation::Resize(target) => resize::apply(frame, *target),
            Operation::StyleTransfer(style) => style.stylize(frame),
        }
    }
}
