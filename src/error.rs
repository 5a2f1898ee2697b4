// Styler Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every fatal condition the pipeline can hit, and the exit code it maps to.

use std::path::PathBuf;
use thiserror::Error;

use crate::operations::OperationError;

/// Pipeline boundary at which a staging artifact or transcode is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Staging,
    Processing,
    Finalizing,
    Publishing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Staging => "staging",
            Stage::Processing => "processing",
            Stage::Finalizing => "finalizing",
            Stage::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input source file does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("unsupported processing method '{0}' (expected grayscale or style-transfer)")]
    UnsupportedMethod(String),

    #[error("style_file_source not provided for style-transfer")]
    MissingStyleSource,

    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("expected {stage} artifact is missing: {path}")]
    MissingArtifact { stage: Stage, path: PathBuf },

    #[error("transcoder failed during {stage}: {reason}")]
    Transcode { stage: Stage, reason: String },

    #[error("frame processing failed at batch {batch}, position {position}: {source}")]
    FrameProcessing {
        batch: u64,
        position: usize,
        #[source]
        source: OperationError,
    },

    #[error("pipeline cancelled")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code reported by the `styler run` command.
    ///
    /// A failed transcode is indistinguishable from a missing artifact at this
    /// boundary, so both map to 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InputNotFound(_) => 1,
            PipelineError::MissingArtifact { .. } | PipelineError::Transcode { .. } => 2,
            PipelineError::UnsupportedMethod(_) => 4,
            PipelineError::MissingStyleSource => 5,
            PipelineError::FrameProcessing { .. } => 6,
            PipelineError::OutputDirMissing(_)
            | PipelineError::Cancelled
            | PipelineError::Media(_)
            | PipelineError::Io(_) => 7,
        }
    }
}

/// Exit code for a command line with too few positional arguments.
pub const EXIT_MISSING_ARGUMENTS: i32 = 3;
