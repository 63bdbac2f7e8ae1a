//! traffic-speed - Main Entry Point
//!
//! `run` starts the detection and analysis pipeline for a bounded duration;
//! `report` regenerates the text report from an existing vehicle log.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use traffic_speed::{
    analysis::report_from_log,
    backend,
    config::{checked_seconds, AppConfig, DEFAULT_CONFIG_FILE},
    pipeline::PipelineCoordinator,
    session::SessionPaths,
};

#[derive(Parser, Debug)]
#[command(name = "traffic-speed", version, about = "Counting-line vehicle speed analysis")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run detection and analysis (the default)
    Run(RunArgs),
    /// Regenerate the report for an existing vehicle log
    Report {
        /// Vehicle log (CSV) written by a previous run
        log: PathBuf,
        /// Report path; defaults to next to the log
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Run duration in hours; defaults to runtime.default_duration_hours
    #[arg(long)]
    hours: Option<f64>,

    /// Ignore the duration and run until the input ends or Ctrl-C
    #[arg(long, conflicts_with = "hours")]
    until_end: bool,

    /// Observation source, overriding camera.url
    #[arg(long, value_name = "PATH")]
    source: Option<String>,

    /// Release replayed frames at their recorded pace
    #[arg(long)]
    realtime: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let result = match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(&cli.config, args),
        Command::Report { log, output } => report(&cli.config, &log, output),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    ExitCode::from(exit_code(&result))
}

/// Process exit code: the command's own code, or 1 for a fatal error
fn exit_code(result: &Result<u8>) -> u8 {
    match result {
        Ok(code) => *code,
        Err(_) => 1,
    }
}

/// `--hours` as a run duration
fn run_duration(hours: f64) -> Result<Duration> {
    if !(hours.is_finite() && hours > 0.0) {
        bail!("--hours must be a positive number, got {}", hours);
    }
    checked_seconds(hours * 3600.0).with_context(|| format!("--hours {} is too large", hours))
}

/// Console logging plus an optional non-blocking file layer
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "traffic-speed.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,traffic_speed=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let config = AppConfig::load_or_default(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run(config_path: &Path, args: RunArgs) -> Result<u8> {
    let mut config = load_config(config_path)?;
    if let Some(source) = args.source {
        config.camera.url = source;
    }

    let duration = if args.until_end {
        None
    } else {
        match args.hours {
            Some(hours) => Some(run_duration(hours)?),
            None => Some(config.runtime.default_duration()),
        }
    };

    tracing::info!("Starting traffic-speed on {}", config.camera.url);
    let paths = SessionPaths::timestamped(&config.output, Local::now());
    let source = backend::source_from_config(&config.camera, args.realtime);
    let coordinator = PipelineCoordinator::new(config).with_duration(duration);
    spawn_interrupt_listener(coordinator.cancel_flag());

    let outcome = coordinator.run(source, paths).context("pipeline failed to start")?;

    if let Some(analyzer) = &outcome.analyzer {
        tracing::info!(
            "{} vehicles | log {} | report {}",
            analyzer.vehicles,
            analyzer.log_path.display(),
            analyzer.report_path.display()
        );
    }
    if outcome.producer_detached || outcome.analyzer_detached {
        tracing::warn!("A pipeline stage was abandoned during shutdown");
    }
    Ok(u8::try_from(outcome.exit_code()).unwrap_or(1))
}

fn report(config_path: &Path, log: &Path, output: Option<PathBuf>) -> Result<u8> {
    let config = load_config(config_path)?;
    let mut paths = SessionPaths::for_existing_log(log);
    if let Some(output) = output {
        paths.report_path = output;
    }

    match report_from_log(&paths, &config)? {
        Some(stats) => {
            tracing::info!(
                "{} vehicles analyzed: {}",
                stats.total,
                stats.pattern.title()
            );
            Ok(0)
        }
        None => Ok(2),
    }
}

/// Raise `cancel` on Ctrl-C
fn spawn_interrupt_listener(cancel: Arc<AtomicBool>) {
    let spawned = std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Interrupted by user");
                        cancel.store(true, Ordering::SeqCst);
                    }
                    Err(e) => tracing::warn!("Ctrl-C handling unavailable: {}", e),
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!("Ctrl-C handling unavailable: {}", e);
    }
}
