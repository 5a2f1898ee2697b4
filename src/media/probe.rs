// Styler Media Probe
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// Stream properties reported by ffprobe for the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate as a float (e.g. 29.97).
    pub frame_rate: f64,
    /// Frame rate as ffprobe printed it (e.g. "30000/1001").
    pub frame_rate_raw: String,
    /// Container-declared frame count, when the container records one.
    pub frame_count: Option<u64>,
    /// Display rotation in degrees, normalized to 0..360.
    pub rotation: u32,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

pub fn probe_video(ffprobe: &Path, path: &Path) -> Result<VideoInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_streams",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe. Is ffmpeg installed?")?;

    if !output.status.success() {
        bail!(
            "Cannot probe video {:?}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_probe_json(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Unexpected ffprobe output for {:?}", path))
}

fn parse_probe_json(json: &str) -> Result<VideoInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json)?;
    let stream = match parsed.streams.into_iter().next() {
        Some(s) => s,
        None => bail!("no video stream found"),
    };

    let (coded_w, coded_h) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => bail!("video stream has no dimensions"),
    };

    // ffmpeg autorotates on decode, so decoded frames follow the display
    // orientation rather than the coded size.
    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| stream.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
        .map(normalize_rotation)
        .unwrap_or(0);
    let (width, height) = if rotation % 180 == 90 {
        (coded_h, coded_w)
    } else {
        (coded_w, coded_h)
    };

    // Unusable rates ("0/0") fall back to 30 fps so the writer gets a valid -r.
    let (frame_rate_raw, frame_rate) = match stream.r_frame_rate {
        Some(raw) => match parse_rate(&raw) {
            Some(rate) => (raw, rate),
            None => ("30/1".to_string(), 30.0),
        },
        None => ("30/1".to_string(), 30.0),
    };

    let frame_count = stream
        .nb_frames
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|n| *n > 0);

    Ok(VideoInfo {
        width,
        height,
        frame_rate,
        frame_rate_raw,
        frame_count,
        rotation,
    })
}

fn normalize_rotation(degrees: f64) -> u32 {
    (degrees.round() as i64).rem_euclid(360) as u32
}

/// r_frame_rate is returned as "num/den" (e.g. "30000/1001")
fn parse_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den != 0.0 && num > 0.0 {
            Some(num / den)
        } else {
            None
        }
    } else {
        s.parse().ok().filter(|r: &f64| *r > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_json() {
        let json = r#"{
            "programs": [],
            "streams": [
                { "width": 1920, "height": 1080, "r_frame_rate": "30000/1001", "nb_frames": "300" }
            ]
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(info.frame_rate_raw, "30000/1001");
        assert_eq!(info.frame_count, Some(300));
    }

    #[test]
    fn test_missing_frame_count_is_none() {
        let json = r#"{ "streams": [ { "width": 640, "height": 360, "r_frame_rate": "25/1" } ] }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.frame_count, None);
        assert_eq!(info.frame_rate, 25.0);
    }

    #[test]
    fn test_display_matrix_rotation_swaps_dimensions() {
        let json = r#"{ "streams": [ {
            "width": 1920, "height": 1080, "r_frame_rate": "30/1",
            "side_data_list": [ { "side_data_type": "Display Matrix", "rotation": -90 } ]
        } ] }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(info.rotation, 270);
    }

    #[test]
    fn test_rotate_tag_swaps_dimensions() {
        let json = r#"{ "streams": [ {
            "width": 1920, "height": 1080, "r_frame_rate": "30/1",
            "tags": { "rotate": "90" }
        } ] }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
    }

    #[test]
    fn test_half_turn_keeps_dimensions() {
        let json = r#"{ "streams": [ {
            "width": 1920, "height": 1080, "r_frame_rate": "30/1",
            "side_data_list": [ { "rotation": 180 } ]
        } ] }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.rotation, 180);
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        let json = r#"{ "streams": [ { "width": 2, "height": 2, "r_frame_rate": "0/0" } ] }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.frame_rate_raw, "30/1");
    }

    #[test]
    fn test_no_stream_is_error() {
        assert!(parse_probe_json(r#"{ "streams": [] }"#).is_err());
    }

    #[test]
    fn test_parse_rate_rejects_zero_denominator() {
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("60"), Some(60.0));
    }
}
