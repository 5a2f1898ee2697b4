// Styler Hardware Acceleration Profile
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Detects an NVIDIA GPU via nvidia-smi so the finalize transcode can decode
// with `-hwaccel cuda`. Everything else runs on the CPU.

use std::process::Command;
use std::str::FromStr;
use tracing::{info, warn};

/// Requested acceleration mode (`STYLER_HWACCEL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwAccelPreference {
    /// Probe nvidia-smi and use CUDA when present.
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for HwAccelPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" | "none" => Ok(Self::Cpu),
            "cuda" | "nvidia" => Ok(Self::Cuda),
            other => Err(format!("unknown hwaccel mode '{}'", other)),
        }
    }
}

/// Acceleration backend used for transcoder invocations.
#[derive(Debug, Clone, PartialEq)]
pub enum HwProfile {
    /// NVIDIA GPU (detected via nvidia-smi, or forced).
    Cuda { name: String, driver_version: String },
    /// Software decode; `threads` is the logical CPU count.
    Cpu { threads: usize },
}

impl std::fmt::Display for HwProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HwProfile::Cuda { name, driver_version } => {
                write!(f, "CUDA: {} (Driver {})", name, driver_version)
            }
            HwProfile::Cpu { threads } => write!(f, "CPU ({} threads)", threads),
        }
    }
}

impl HwProfile {
    pub fn detect(preference: HwAccelPreference) -> Self {
        match preference {
            HwAccelPreference::Cpu => Self::cpu(),
            HwAccelPreference::Cuda => Self::try_nvidia().unwrap_or_else(|| {
                warn!("[HW] CUDA forced but nvidia-smi found no GPU; passing -hwaccel cuda anyway");
                HwProfile::Cuda {
                    name: "unknown".to_string(),
                    driver_version: "unknown".to_string(),
                }
            }),
            HwAccelPreference::Auto => Self::try_nvidia().unwrap_or_else(|| {
                let cpu = Self::cpu();
                info!("[HW] No NVIDIA GPU detected. Using {}", cpu);
                cpu
            }),
        }
    }

    pub fn cpu() -> Self {
        HwProfile::Cpu {
            threads: num_cpus::get(),
        }
    }

    fn try_nvidia() -> Option<Self> {
        let output = Command::new("nvidia-smi")
            .args(["--query-gpu=name,driver_version", "--format=csv,noheader"])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let profile = parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))?;
        info!("[HW] ✓ NVIDIA GPU detected: {}", profile);
        Some(profile)
    }

    /// Decode-side flags for ffmpeg (`-hwaccel cuda`), if any.
    pub fn ffmpeg_hwaccel(&self) -> Option<&'static str> {
        match self {
            HwProfile::Cuda { .. } => Some("cuda"),
            HwProfile::Cpu { .. } => None,
        }
    }

    /// Logical CPUs available for frame workers.
    pub fn cpu_threads(&self) -> usize {
        match self {
            HwProfile::Cpu { threads } => *threads,
            HwProfile::Cuda { .. } => num_cpus::get(),
        }
    }
}

fn parse_nvidia_smi(stdout: &str) -> Option<HwProfile> {
    let first = stdout.lines().next()?;
    let (name, driver) = first.split_once(',')?;
    let (name, driver) = (name.trim(), driver.trim());
    if name.is_empty() || driver.is_empty() {
        return None;
    }
    Some(HwProfile::Cuda {
        name: name.to_string(),
        driver_version: driver.to_string(),
    })
}

/// Print the detected profile (for the `styler hw` command).
pub fn print_hw_status(preference: HwAccelPreference) {
    let profile = HwProfile::detect(preference);
    println!("=== Styler Hardware Status ===");
    println!("Backend: {}", profile);
    println!(
        "FFmpeg HW Accel: {}",
        profile.ffmpeg_hwaccel().unwrap_or("none")
    );
    println!("CPU threads: {}", profile.cpu_threads());
}
