// Styler Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Two layers: the per-task JSON blob passed on the command line, resolved into
// an immutable `PipelineConfig`, and process-level `RuntimeSettings` read from
// the environment (and `.env`).

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::hw_accel::HwAccelPreference;
use crate::media::MediaTools;
use crate::operations::Method;

pub const DEFAULT_FRAME_DROP_RATE: f64 = 0.25;
pub const DEFAULT_SCALING_MAX_STYLE: u32 = 250;
pub const DEFAULT_PARALLELISM: usize = 3;

pub const STYLE_FILE_SOURCE_KEY: &str = "style_file_source";

/// Resolved processing parameters. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub frame_drop_rate: f64,
    pub scaling_max_dimension: Option<u32>,
    pub scaling_max_style: u32,
    pub operation_configuration: Map<String, Value>,
    pub parallelism: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_drop_rate: DEFAULT_FRAME_DROP_RATE,
            scaling_max_dimension: None,
            scaling_max_style: DEFAULT_SCALING_MAX_STYLE,
            operation_configuration: Map::new(),
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawConfig {
    frame_drop_rate: f64,
    scaling_max_dimension: Option<u32>,
    scaling_max_style: u32,
    operation_configuration: Map<String, Value>,
    parallelism: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        let d = PipelineConfig::default();
        Self {
            frame_drop_rate: d.frame_drop_rate,
            scaling_max_dimension: d.scaling_max_dimension,
            scaling_max_style: d.scaling_max_style,
            operation_configuration: d.operation_configuration,
            parallelism: d.parallelism,
        }
    }
}

impl PipelineConfig {
    /// Resolve the optional JSON blob. Anything unparseable or out of range
    /// falls back to defaults as a whole; this never fails.
    pub fn resolve(json: Option<&str>) -> Self {
        let Some(json) = json else {
            info!("[CONFIG] Configuration not provided, using default values");
            return Self::default();
        };

        match Self::parse(json) {
            Ok(config) => {
                info!("[CONFIG] Configuration loaded: {}", json.trim());
                config
            }
            Err(reason) => {
                warn!("[CONFIG] Invalid configuration, using default values: {}", reason);
                Self::default()
            }
        }
    }

    fn parse(json: &str) -> Result<Self, String> {
        let raw: RawConfig = serde_json::from_str(json).map_err(|e| e.to_string())?;

        if !(0.0..1.0).contains(&raw.frame_drop_rate) {
            return Err(format!("frame_drop_rate {} outside [0, 1)", raw.frame_drop_rate));
        }
        if raw.scaling_max_dimension == Some(0) {
            return Err("scaling_max_dimension must be positive".into());
        }
        if raw.scaling_max_style == 0 {
            return Err("scaling_max_style must be positive".into());
        }
        if raw.parallelism == 0 {
            return Err("parallelism must be at least 1".into());
        }

        Ok(Self {
            frame_drop_rate: raw.frame_drop_rate,
            scaling_max_dimension: raw.scaling_max_dimension,
            scaling_max_style: raw.scaling_max_style,
            operation_configuration: raw.operation_configuration,
            parallelism: raw.parallelism,
        })
    }

    /// Style image named in `operation_configuration`, if any.
    pub fn style_file_source(&self) -> Option<PathBuf> {
        self.operation_configuration
            .get(STYLE_FILE_SOURCE_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn drops_frames(&self) -> bool {
        self.frame_drop_rate > 0.0
    }
}

/// One invocation of the pipeline.
#[derive(Debug, Clone)]
pub struct VideoTask {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub method: Method,
    pub config: PipelineConfig,
}

impl VideoTask {
    /// Unknown methods are rejected here, before any work starts.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        method: &str,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            method: method.parse()?,
            config,
        })
    }
}

/// Process-level settings, independent of any single task.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub tmp_dir: PathBuf,
    pub tools: MediaTools,
    pub transcode_timeout: Option<Duration>,
    pub transcode_retries: u32,
    pub hwaccel: HwAccelPreference,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tmp_dir: default_tmp_dir(),
            tools: MediaTools::default(),
            transcode_timeout: None,
            transcode_retries: 0,
            hwaccel: HwAccelPreference::Auto,
        }
    }
}

impl RuntimeSettings {
    /// Read `STYLER_*` variables, keeping defaults for anything unset or invalid.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(dir) = std::env::var("STYLER_TMP_DIR") {
            settings.tmp_dir = PathBuf::from(dir);
        }
        if let Ok(bin) = std::env::var("STYLER_FFMPEG") {
            settings.tools.ffmpeg = PathBuf::from(bin);
        }
        if let Ok(bin) = std::env::var("STYLER_FFPROBE") {
            settings.tools.ffprobe = PathBuf::from(bin);
        }
        if let Some(secs) = env_parse::<u64>("STYLER_TRANSCODE_TIMEOUT_SECS") {
            settings.transcode_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(retries) = env_parse::<u32>("STYLER_TRANSCODE_RETRIES") {
            settings.transcode_retries = retries;
        }
        if let Some(pref) = env_parse::<HwAccelPreference>("STYLER_HWACCEL") {
            settings.hwaccel = pref;
        }

        settings
    }
}

fn default_tmp_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| Path::new(".").to_path_buf())
        .join("tmp")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("[CONFIG] Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
