// End-to-end runs against a real ffmpeg install. Each test returns early when
// ffmpeg, ffprobe or libx264 are missing.

use std::path::{Path, PathBuf};
use std::process::Command;
use styler_core::hw_accel::HwProfile;
use styler_core::media::{probe_video, MediaTools};
use styler_core::{Pipeline, PipelineConfig, RuntimeSettings, VideoTask};
use tokio_util::sync::CancellationToken;

fn ffmpeg_ready() -> bool {
    let encoders = match Command::new("ffmpeg").args(["-hide_banner", "-encoders"]).output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
        _ => return false,
    };
    let probe_ok = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    probe_ok && encoders.contains("libx264") && encoders.contains("mpeg4")
}

fn make_test_video(path: &Path, size: &str, frames: u32) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}:rate=30", size))
        .arg("-frames:v")
        .arg(frames.to_string())
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-g", "1"])
        .arg(path)
        .output()
        .expect("Failed to execute ffmpeg");
    if !status.status.success() {
        eprintln!("FFmpeg stderr: {}", String::from_utf8_lossy(&status.stderr));
        panic!("Failed to create test video");
    }
}

fn count_frames(path: &Path) -> u64 {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames",
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .expect("Failed to execute ffprobe");
    String::from_utf8_lossy(&out.stdout).trim().parse().unwrap()
}

fn pipeline(tmp: PathBuf) -> Pipeline {
    let settings = RuntimeSettings {
        tmp_dir: tmp,
        ..RuntimeSettings::default()
    };
    Pipeline::new(settings, HwProfile::Cpu { threads: 4 }, CancellationToken::new())
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[tokio::test]
async fn test_grayscale_thirty_frames_parallel() {
    if !ffmpeg_ready() {
        eprintln!("skipping: ffmpeg with libx264 not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.mp4");
    make_test_video(&input, "320x240", 30);

    let tmp = dir.path().join("tmp");
    let task = VideoTask::new(
        &input,
        dir.path().join("gray"),
        "grayscale",
        PipelineConfig::resolve(Some(r#"{"frame_drop_rate": 0, "parallelism": 3}"#)),
    )
    .unwrap();

    let report = pipeline(tmp.clone()).run(&task).await.unwrap();

    assert_eq!(report.output, dir.path().join("gray.mp4"));
    assert_eq!(report.schedule.frames, 29);
    assert_eq!(count_frames(&report.output), 29);
    assert!(input.exists(), "raw input must never be deleted");
    assert!(dir_is_empty(&tmp), "staging artifacts left behind");
}

#[tokio::test]
async fn test_scaling_caps_longer_side() {
    if !ffmpeg_ready() {
        eprintln!("skipping: ffmpeg with libx264 not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hd.mp4");
    make_test_video(&input, "1920x1080", 6);

    let tmp = dir.path().join("tmp");
    let task = VideoTask::new(
        &input,
        dir.path().join("small"),
        "grayscale",
        PipelineConfig::resolve(Some(r#"{"scaling_max_dimension": 480, "frame_drop_rate": 0}"#)),
    )
    .unwrap();

    let report = pipeline(tmp.clone()).run(&task).await.unwrap();
    assert_eq!((report.geometry.width, report.geometry.height), (480, 270));

    let info = probe_video(&MediaTools::default().ffprobe, &report.output).unwrap();
    assert_eq!((info.width, info.height), (480, 270));
    assert!(dir_is_empty(&tmp));
}

#[tokio::test]
async fn test_style_transfer_with_frame_drop() {
    if !ffmpeg_ready() {
        eprintln!("skipping: ffmpeg with libx264 not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    make_test_video(&input, "160x120", 15);

    let style = dir.path().join("style.png");
    image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, 40, (y * 8) as u8]))
        .save(&style)
        .unwrap();

    let config = format!(
        r#"{{"frame_drop_rate": 0.5, "scaling_max_style": 16, "operation_configuration": {{"style_file_source": "{}"}}}}"#,
        style.display()
    );
    let tmp = dir.path().join("tmp");
    let task = VideoTask::new(
        &input,
        dir.path().join("styled.mp4"),
        "style-transfer",
        PipelineConfig::resolve(Some(&config)),
    )
    .unwrap();

    let report = pipeline(tmp.clone()).run(&task).await.unwrap();
    assert_eq!(report.output, dir.path().join("styled.mp4"));
    assert!(report.schedule.frames > 0);
    assert!(report.output.exists());
    assert!(dir_is_empty(&tmp));
}
