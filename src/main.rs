use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use attention_monitor::attention::{AttentionClassifier, LinearAttentionModel};
use attention_monitor::classify::NoEmotionModel;
use attention_monitor::config::Config;
use attention_monitor::feature_log::{FeatureLog, FeatureLogError};
use attention_monitor::logging::init_tracing;
use attention_monitor::replay::{ReplayError, ReplayTrace};
use attention_monitor::session::{run_calibration, run_capture, WindowEmitter};
use attention_monitor::thresholds::{ThresholdConfig, ThresholdError};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Attention monitoring from facial landmarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive personal thresholds and write them to the threshold file
    Calibrate {
        /// Observation length in seconds (default: calibration_duration)
        #[arg(long)]
        duration: Option<f64>,

        /// Threshold file to write (default: THRESHOLD_CONFIG_PATH)
        #[arg(long)]
        out: Option<PathBuf>,

        /// JSON-lines landmark trace to replay
        #[arg(long)]
        trace: PathBuf,
    },
    /// Aggregate a session into feature rows under OUTPUT_DIR
    Capture {
        /// Threshold file to read (default: THRESHOLD_CONFIG_PATH)
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines landmark trace to replay
        #[arg(long)]
        trace: PathBuf,
    },
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Thresholds(#[from] ThresholdError),
    #[error(transparent)]
    FeatureLog(#[from] FeatureLogError),
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env();
    init_tracing(&config.log_config());
    tracing::info!("Starting attention-monitor");

    let keep_running = Arc::new(AtomicBool::new(true));
    tokio::spawn(shutdown_signal(Arc::clone(&keep_running)));

    let flag = Arc::clone(&keep_running);
    let task = tokio::task::spawn_blocking(move || run(cli.command, &config, &flag));

    match task.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Session task panicked");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config, keep_running: &AtomicBool) -> Result<(), AppError> {
    match command {
        Command::Calibrate {
            duration,
            out,
            trace,
        } => {
            let out = out.unwrap_or_else(|| config.threshold_config_path.clone());
            let seconds = duration.unwrap_or(ThresholdConfig::default().calibration_duration);
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(AppError::InvalidArgument(format!(
                    "--duration must be > 0, got {seconds}"
                )));
            }

            let trace = ReplayTrace::open(&trace)?;
            let mut frames = trace.frames(Utc::now());
            let mut detector = trace.landmarks();
            let report = run_calibration(
                &mut frames,
                &mut detector,
                Duration::milliseconds((seconds * 1000.0).round() as i64),
                keep_running,
            );

            report.thresholds.save(&out)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Capture {
            config: threshold_path,
            trace,
        } => {
            let threshold_path =
                threshold_path.unwrap_or_else(|| config.threshold_config_path.clone());
            let thresholds = ThresholdConfig::load_or_default(&threshold_path);
            let log = FeatureLog::open(&config.output_dir)?;
            let attention_model = config
                .attention_model_path
                .as_deref()
                .and_then(|path| match LinearAttentionModel::load(path) {
                    Ok(model) => Some(model),
                    Err(e) => {
                        tracing::warn!(error = %e, "Attention model unavailable, rows stay unclassified");
                        None
                    }
                });

            let trace = ReplayTrace::open(&trace)?;
            let mut frames = trace.frames(Utc::now());
            let mut detector = trace.landmarks();
            let mut emotion = NoEmotionModel;
            let mut emitter = WindowEmitter::new(
                &log,
                &mut emotion,
                attention_model
                    .as_ref()
                    .map(|model| model as &dyn AttentionClassifier),
            );

            let report = run_capture(
                &mut frames,
                &mut detector,
                &mut emitter,
                thresholds,
                keep_running,
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn shutdown_signal(keep_running: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    keep_running.store(false, Ordering::SeqCst);
}
