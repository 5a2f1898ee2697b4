// Styler Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use styler_core::error::EXIT_MISSING_ARGUMENTS;
use styler_core::hw_accel::print_hw_status;
use styler_core::operations::style_transfer::stylize_image;
use styler_core::{Pipeline, PipelineConfig, PipelineError, RuntimeSettings, VideoTask};

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "styler")]
#[command(about = "Per-frame video transform pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform every frame of a video and publish it as <output>.mp4
    Run {
        /// Source video
        input: PathBuf,

        /// Output path (".mp4" is appended)
        output: PathBuf,

        /// grayscale | style-transfer
        method: String,

        /// JSON configuration blob
        config: Option<String>,
    },

    /// Apply style transfer to a single image
    Stylize {
        content: PathBuf,
        style: PathBuf,
        output: PathBuf,

        /// Longer side of the style image after scaling
        #[arg(long, default_value_t = 250)]
        max_style: u32,

        /// Cap the content image's longer side
        #[arg(long)]
        max_dimension: Option<u32>,
    },

    /// Show the detected hardware acceleration profile
    Hw,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("🚨 [STYLER PANIC] at {}: {}", location, message);
    }));

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::MissingSubcommand
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            let _ = e.print();
            std::process::exit(EXIT_MISSING_ARGUMENTS);
        }
        Err(e) => e.exit(),
    };

    let settings = RuntimeSettings::from_env();

    match args.command {
        Commands::Run {
            input,
            output,
            method,
            config,
        } => {
            let code = match run_video(settings, input, output, &method, config.as_deref()).await {
                Ok(()) => 0,
                Err(e) => {
                    error!("[STYLER] {}", e);
                    e.exit_code()
                }
            };
            std::process::exit(code);
        }

        Commands::Stylize {
            content,
            style,
            output,
            max_style,
            max_dimension,
        } => {
            let result = tokio::task::spawn_blocking(move || {
                stylize_image(&content, &style, &output, max_style, max_dimension)
            })
            .await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!("[STYLER] {:#}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("[STYLER] stylize task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Hw => print_hw_status(settings.hwaccel),
    }
}

async fn run_video(
    settings: RuntimeSettings,
    input: PathBuf,
    output: PathBuf,
    method: &str,
    config: Option<&str>,
) -> Result<(), PipelineError> {
    let task = VideoTask::new(input, output, method, PipelineConfig::resolve(config))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[STYLER] Ctrl-C received, cancelling");
            on_signal.cancel();
        }
    });

    let pipeline = Pipeline::from_settings(settings, cancel);
    let report = pipeline.run(&task).await?;
    info!(
        "[STYLER] Wrote {:?} ({} frames, {:.2}s)",
        report.output,
        report.schedule.frames,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
