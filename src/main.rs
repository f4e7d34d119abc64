use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slidewin::config::SlidewinConfig;
use slidewin::probe;

/// Drive a sliding-window limiter from many concurrent tasks.
#[derive(Debug, Parser)]
#[command(name = "slidewin-probe", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override limiter capacity
    #[arg(long)]
    max_events: Option<usize>,

    /// Override window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Override the initial limit (clamped to capacity)
    #[arg(long, allow_hyphen_values = true)]
    limit: Option<i64>,

    /// Override number of concurrent tasks
    #[arg(long)]
    tasks: Option<usize>,

    /// Override attempts per task
    #[arg(long)]
    attempts: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);
    if args.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting slidewin probe");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => SlidewinConfig::from_file(path)?,
        None => SlidewinConfig::default(),
    };
    if let Some(max_events) = args.max_events {
        config.limiter.max_events = max_events;
    }
    if let Some(window_ms) = args.window_ms {
        config.limiter.window_ms = window_ms;
    }
    if args.limit.is_some() {
        config.limiter.limit = args.limit;
    }
    if let Some(tasks) = args.tasks {
        config.probe.tasks = tasks;
    }
    if let Some(attempts) = args.attempts {
        config.probe.attempts = attempts;
    }
    config.validate()?;
    info!(
        max_events = config.limiter.max_events,
        window_ms = config.limiter.window_ms,
        "Configuration loaded"
    );

    let limiter = Arc::new(config.limiter.build());
    let report = probe::run(limiter, &config.probe).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
