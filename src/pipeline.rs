// Styler Pipeline Controller
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// validate → probe → stage → schedule → finalize → publish. Any error tears
// down the staging artifacts before it propagates.

use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{RuntimeSettings, VideoTask};
use crate::error::PipelineError;
use crate::geometry::TargetGeometry;
use crate::hw_accel::HwProfile;
use crate::media::{probe_frame, FfmpegReader, FfmpegWriter, FrameSink, MediaTools, WriterSpec};
use crate::operations::{Method, Operation, StyleMatrix};
use crate::scheduler::{bounded_parallelism, FrameScheduler, ScheduleReport};
use crate::staging::StagingFile;
use crate::transcoder::Transcoder;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub geometry: TargetGeometry,
    pub schedule: ScheduleReport,
    pub elapsed: Duration,
}

pub struct Pipeline {
    settings: RuntimeSettings,
    hw: HwProfile,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(settings: RuntimeSettings, hw: HwProfile, cancel: CancellationToken) -> Self {
        Self {
            settings,
            hw,
            cancel,
        }
    }

    /// Detect the hardware profile from the settings' preference.
    pub fn from_settings(settings: RuntimeSettings, cancel: CancellationToken) -> Self {
        let hw = HwProfile::detect(settings.hwaccel);
        Self::new(settings, hw, cancel)
    }

    pub async fn run(&self, task: &VideoTask) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        info!(
            "[PIPELINE] {} {:?} → {:?}",
            task.method, task.input_path, task.output_path
        );

        let style_source = self.validate(task)?;

        let mut staging = StagingFile::new(&self.settings.tmp_dir, &task.input_path, &task.output_path);
        match self.execute(task, &mut staging, style_source).await {
            Ok((output, geometry, schedule)) => {
                let report = RunReport {
                    output,
                    geometry,
                    schedule,
                    elapsed: started.elapsed(),
                };
                info!(
                    "[PIPELINE] ✅ Done in {:.2}s: {:?} ({}, {} frames)",
                    report.elapsed.as_secs_f64(),
                    report.output,
                    report.geometry,
                    report.schedule.frames
                );
                Ok(report)
            }
            Err(e) => {
                error!("[PIPELINE] ❌ {}", e);
                staging.fail();
                Err(e)
            }
        }
    }

    /// Cheap checks before any decoding. Returns the style image path for
    /// style-transfer.
    fn validate(&self, task: &VideoTask) -> Result<Option<PathBuf>, PipelineError> {
        if !task.input_path.is_file() {
            return Err(PipelineError::InputNotFound(task.input_path.clone()));
        }

        let style_source = match task.method {
            Method::StyleTransfer => Some(
                task.config
                    .style_file_source()
                    .ok_or(PipelineError::MissingStyleSource)?,
            ),
            Method::Grayscale => None,
        };

        if let Some(parent) = task.output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(PipelineError::OutputDirMissing(parent.to_path_buf()));
            }
        }

        if !self.settings.tmp_dir.is_dir() {
            info!("[PIPELINE] Creating tmp directory {:?}", self.settings.tmp_dir);
            fs::create_dir_all(&self.settings.tmp_dir)?;
        }

        Ok(style_source)
    }

    async fn execute(
        &self,
        task: &VideoTask,
        staging: &mut StagingFile,
        style_source: Option<PathBuf>,
    ) -> Result<(PathBuf, TargetGeometry, ScheduleReport), PipelineError> {
        let config = &task.config;
        let tools = self.settings.tools.clone();

        staging.remove_stale()?;

        let probe = {
            let tools = tools.clone();
            let input = task.input_path.clone();
            task::spawn_blocking(move || probe_frame(&tools, &input))
                .await
                .map_err(|e| anyhow!("probe task failed: {}", e))??
        };
        let geometry = TargetGeometry::resolve(probe.width, probe.height, config.scaling_max_dimension);
        info!(
            "[PIPELINE] Source {}x{} → target {}",
            probe.width, probe.height, geometry
        );

        let style = match style_source {
            Some(path) => {
                let max_style = config.scaling_max_style;
                let matrix = task::spawn_blocking(move || StyleMatrix::load(&path, max_style))
                    .await
                    .map_err(|e| anyhow!("style task failed: {}", e))??;
                Some(Arc::new(matrix))
            }
            None => None,
        };
        let operation = Operation::for_method(task.method, style)?;

        let transcoder = Transcoder::new(&tools.ffmpeg, self.hw.clone(), self.cancel.clone())
            .with_timeout(self.settings.transcode_timeout)
            .with_retries(self.settings.transcode_retries);

        staging
            .stage(
                &transcoder,
                (probe.width, probe.height),
                geometry,
                config.drops_frames().then_some(config.frame_drop_rate),
            )
            .await?;

        let schedule = {
            let job = ProcessJob {
                tools,
                staged: staging.staged_path().to_path_buf(),
                processed: staging.processed_path().to_path_buf(),
                geometry,
                method: task.method,
                operation,
                parallelism: bounded_parallelism(config.parallelism, self.hw.cpu_threads()),
                cancel: self.cancel.clone(),
            };
            task::spawn_blocking(move || job.run())
                .await
                .map_err(|e| anyhow!("frame processing task failed: {}", e))??
        };
        staging.mark_processed()?;

        staging.finalize(&transcoder).await?;
        let output = staging.publish()?;

        Ok((output, geometry, schedule))
    }
}

/// Everything the blocking processing stage needs, owned.
struct ProcessJob {
    tools: MediaTools,
    staged: PathBuf,
    processed: PathBuf,
    geometry: TargetGeometry,
    method: Method,
    operation: Operation,
    parallelism: usize,
    cancel: CancellationToken,
}

impl ProcessJob {
    fn run(self) -> Result<ScheduleReport, PipelineError> {
        let mut reader = FfmpegReader::open(&self.tools, &self.staged)?;
        let info = reader.info().clone();
        if !self.geometry.same_as(info.width, info.height) {
            return Err(staged_mismatch(&self.staged, info.width, info.height, self.geometry));
        }

        let spec = WriterSpec {
            width: self.geometry.width,
            height: self.geometry.height,
            format: self.method.output_format(),
            frame_rate: info.frame_rate_raw.clone(),
        };
        let mut writer = FfmpegWriter::create(&self.tools, &self.processed, spec)?;

        let scheduler = FrameScheduler::new(self.parallelism, self.cancel)?;
        info!(
            "[PIPELINE] Processing {:?} ({} frames @ {:.2} fps) with {} x{}",
            self.staged,
            info.frame_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string()),
            info.frame_rate,
            self.operation.name(),
            scheduler.parallelism()
        );
        let report = scheduler.run(&mut reader, &mut writer, &self.operation)?;
        writer.finish()?;
        Ok(report)
    }
}

fn staged_mismatch(path: &Path, width: u32, height: u32, target: TargetGeometry) -> PipelineError {
    PipelineError::Media(anyhow!(
        "staged file {:?} is {}x{}, expected {}",
        path,
        width,
        height,
        target
    ))
}
