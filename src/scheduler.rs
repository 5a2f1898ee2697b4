// Styler Frame Batch Scheduler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Reads up to `parallelism` frames, fans them out over a dedicated rayon pool,
// waits for the whole batch, then writes the results in read order. Only the
// calling thread touches the source and the sink.

use anyhow::anyhow;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::media::{Frame, FrameSink, FrameSource};
use crate::operations::{FrameOperation, OperationError};

const PROGRESS_INTERVAL: u64 = 10;

/// Batch width ceiling, per available CPU thread. Each slot holds a decoded
/// frame, so an unbounded width is unbounded memory.
pub const MAX_PARALLELISM_PER_CPU: usize = 4;

/// Clamp the configured parallelism to `1..=cpus * MAX_PARALLELISM_PER_CPU`.
pub fn bounded_parallelism(requested: usize, cpus: usize) -> usize {
    let ceiling = cpus.max(1).saturating_mul(MAX_PARALLELISM_PER_CPU);
    if requested > ceiling {
        warn!(
            "[SCHEDULER] parallelism {} exceeds {} ({} CPU threads), clamping",
            requested, ceiling, cpus
        );
        return ceiling;
    }
    if requested > cpus {
        warn!(
            "[SCHEDULER] parallelism {} exceeds {} available CPU threads",
            requested, cpus
        );
    }
    requested.max(1)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Frames written to the sink.
    pub frames: u64,
    pub batches: u64,
    pub elapsed: Duration,
    /// Time until the first frame was written.
    pub warmup: Option<Duration>,
}

impl ScheduleReport {
    pub fn average_per_frame(&self) -> Option<Duration> {
        (self.frames > 0).then(|| self.elapsed / self.frames as u32)
    }

    fn log_summary(&self) {
        info!(
            "[SCHEDULER] Total {:.2}s | Frames {} | Batches {} | Warmup {:.2}s | AVG {:.4}s / frame",
            self.elapsed.as_secs_f64(),
            self.frames,
            self.batches,
            self.warmup.unwrap_or_default().as_secs_f64(),
            self.average_per_frame().unwrap_or_default().as_secs_f64()
        );
    }
}

pub struct FrameScheduler {
    parallelism: usize,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl FrameScheduler {
    pub fn new(parallelism: usize, cancel: CancellationToken) -> Result<Self, PipelineError> {
        let parallelism = parallelism.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("styler-frame-{}", i))
            .build()
            .map_err(|e| PipelineError::Media(anyhow!("Failed to build frame pool: {}", e)))?;

        Ok(Self {
            parallelism,
            pool,
            cancel,
        })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Drain `source` through `operation` into `sink`.
    ///
    /// With `parallelism > 1` the leading (probe) frame is skipped and at most
    /// `total - 1` frames are processed. With `parallelism == 1` every frame is
    /// processed one at a time.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        operation: &dyn FrameOperation,
    ) -> Result<ScheduleReport, PipelineError> {
        let mut progress = Progress::new(source.frame_count());

        let report = if self.parallelism == 1 {
            info!("[SCHEDULER] Serial mode");
            self.run_serial(source, sink, operation, &mut progress)?
        } else {
            info!("[SCHEDULER] Batched mode, {} workers", self.parallelism);
            self.run_batched(source, sink, operation, &mut progress)?
        };

        report.log_summary();
        Ok(report)
    }

    fn run_serial(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        operation: &dyn FrameOperation,
        progress: &mut Progress,
    ) -> Result<ScheduleReport, PipelineError> {
        let mut index = 0u64;
        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let Some(frame) = source.read_frame()? else {
                break;
            };
            let result = operation
                .apply(&frame)
                .map_err(|e| frame_failure(index, 0, e))?;
            sink.write_frame(&result)?;
            progress.frame_written();
            index += 1;
        }
        Ok(progress.report(index))
    }

    fn run_batched(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        operation: &dyn FrameOperation,
        progress: &mut Progress,
    ) -> Result<ScheduleReport, PipelineError> {
        // The probe frame was already inspected by the controller.
        if source.read_frame()?.is_none() {
            return Ok(progress.report(0));
        }
        let limit = progress.total.map(|t| t.saturating_sub(1));

        let mut batch_index = 0u64;
        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let want = match limit {
                Some(limit) => {
                    let left = limit.saturating_sub(progress.written);
                    (left as usize).min(self.parallelism)
                }
                None => self.parallelism,
            };
            if want == 0 {
                break;
            }

            let batch = read_batch(source, want)?;
            if batch.is_empty() {
                break;
            }

            let results: Vec<Result<Frame, OperationError>> = self
                .pool
                .install(|| batch.par_iter().map(|f| operation.apply(f)).collect());

            // Nothing from a failed batch reaches the sink.
            let mut frames = Vec::with_capacity(results.len());
            for (position, result) in results.into_iter().enumerate() {
                frames.push(result.map_err(|e| frame_failure(batch_index, position, e))?);
            }

            for frame in &frames {
                sink.write_frame(frame)?;
                progress.frame_written();
            }

            batch_index += 1;
            if batch.len() < want {
                break;
            }
        }

        Ok(progress.report(batch_index))
    }
}

fn read_batch(source: &mut dyn FrameSource, want: usize) -> Result<Vec<Frame>, PipelineError> {
    let mut batch = Vec::with_capacity(want);
    while batch.len() < want {
        match source.read_frame()? {
            Some(frame) => batch.push(frame),
            None => break,
        }
    }
    Ok(batch)
}

fn frame_failure(batch: u64, position: usize, source: OperationError) -> PipelineError {
    error!(
        "[SCHEDULER] Frame failed at batch {}, position {}: {}",
        batch, position, source
    );
    PipelineError::FrameProcessing {
        batch,
        position,
        source,
    }
}

struct Progress {
    total: Option<u64>,
    written: u64,
    started: Instant,
    warmup: Option<Duration>,
}

impl Progress {
    fn new(total: Option<u64>) -> Self {
        Self {
            total,
            written: 0,
            started: Instant::now(),
            warmup: None,
        }
    }

    fn frame_written(&mut self) {
        if self.warmup.is_none() {
            self.warmup = Some(self.started.elapsed());
        }
        self.written += 1;
        if self.written % PROGRESS_INTERVAL == 0 {
            match self.total {
                Some(total) => info!("[SCHEDULER] Frame {}/{}", self.written, total),
                None => info!("[SCHEDULER] Frame {}", self.written),
            }
        }
    }

    fn report(&self, batches: u64) -> ScheduleReport {
        ScheduleReport {
            frames: self.written,
            batches,
            elapsed: self.started.elapsed(),
            warmup: self.warmup,
        }
    }
}
