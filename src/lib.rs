// Styler Core Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod config;
pub mod error;
pub mod geometry;
pub mod hw_accel;
pub mod io_shield;
pub mod media;
pub mod operations;
pub mod pipeline;
pub mod scheduler;
pub mod staging;
pub mod transcoder;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PipelineConfig, RuntimeSettings, VideoTask};
pub use error::{PipelineError, Stage};
pub use pipeline::{Pipeline, RunReport};
