use anyhow::{Context, Result};
use clap::Parser;
use dockdash::*;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Terminal dashboard of per-container CPU and memory usage.
#[derive(Debug, Parser)]
#[command(name = "dockdash", version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Log file; overrides `logging.file`. The terminal belongs to the dashboard.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut app_config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.log_file {
        app_config.logging.file = path;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&app_config.logging.file)
        .with_context(|| format!("open log file {}", app_config.logging.file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .init();
    tracing::info!("Starting {} {}", version::NAME, version::VERSION);

    let docker_repo = Arc::new(docker_repo::DockerRepo::connect(&app_config.docker).await?);
    let mut engine = engine::spawn(docker_repo, app_config.engine());

    let result = ui::run(&mut engine, app_config.redraw_interval()).await;
    engine.shutdown().await;
    if let Err(e) = &result {
        tracing::error!("Dashboard exited with error: {:#}", e);
    }
    tracing::info!("Stopped");
    result
}
