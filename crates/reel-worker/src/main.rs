//! reelcast command-line renderer.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::{check_ffmpeg, check_ffprobe, probe_media, AccelerationCache};
use reel_models::{PipelineResult, RenderJob};
use reel_worker::{InMemoryOutputStore, PipelineContext, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "reelcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one or more job files; prints one result per job.
    Render(RenderArgs),
    /// Print what ffprobe reports about a media file.
    Probe {
        path: PathBuf,
    },
    /// Print the JSON schema of a job file.
    Schema,
    /// Check for ffmpeg/ffprobe and report the encoder path.
    Doctor,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Job JSON files.
    #[arg(required = true)]
    jobs: Vec<PathBuf>,

    /// Skip the NVENC probe and encode with libx264.
    #[arg(long, default_value_t = false)]
    force_software: bool,

    /// Override the work root.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Pretty-print results.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reelcast=info,reel_worker=info,reel_media=info"));

    // stdout carries results; logs go to stderr
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn init_metrics() -> anyhow::Result<()> {
    let Ok(addr) = std::env::var("METRICS_ADDR") else {
        return Ok(());
    };
    let addr: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid METRICS_ADDR {addr:?}"))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Probe { path } => cmd_probe(path).await,
        Command::Schema => cmd_schema(),
        Command::Doctor => cmd_doctor().await,
    }
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<ExitCode> {
    init_metrics()?;

    let mut config = WorkerConfig::from_env();
    if args.force_software {
        config.force_software = true;
    }
    if let Some(work_dir) = args.work_dir {
        config.work_dir = work_dir;
    }
    config.validate()?;
    info!(?config, "Worker config");

    let store = Arc::new(InMemoryOutputStore::new());
    let ctx = PipelineContext::new(config).with_store(store);

    let mut failures = 0usize;
    for path in &args.jobs {
        let result = match load_job(path).await {
            Ok(job) => ctx.run(&job).await,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable job file");
                PipelineResult::failure(reel_models::ErrorKind::Precondition, format!("{e:#}"), 0)
            }
        };
        if !result.success {
            failures += 1;
        }
        let text = if args.pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{text}");
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn load_job(path: &Path) -> anyhow::Result<RenderJob> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid job file {}", path.display()))
}

async fn cmd_probe(path: PathBuf) -> anyhow::Result<ExitCode> {
    let asset = probe_media(&path).await?;
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_schema() -> anyhow::Result<ExitCode> {
    let schema = schemars::schema_for!(RenderJob);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_doctor() -> anyhow::Result<ExitCode> {
    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    let config = WorkerConfig::from_env();
    let acceleration = AccelerationCache::new(config.acceleration_mode(), config.probe_timeout)
        .get()
        .await;
    println!("ffmpeg:       {}", ffmpeg.display());
    println!("ffprobe:      {}", ffprobe.display());
    println!("acceleration: {acceleration}");
    Ok(ExitCode::SUCCESS)
}
