//! measurement-events - threshold interval events from stdin
//!
//! Reads `<time>,<level>` measurements from stdin, writes interval events
//! to stdout and rejected-line diagnostics plus logs to stderr.

use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use measurement_events::{LoggingConfig, Pipeline, PipelineConfig, PipelineSummary};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FORMAT_HELP: &str = "\
Supported input format:
Time,Level
1,0
2,1
4,1
5,0

Output format:
Start Time,End Time,Level
2,4,1";

/// measurement-events CLI
#[derive(Debug, Parser)]
#[command(name = "measurement-events")]
#[command(
    about = "Reads measurements from stdin and writes threshold events to stdout",
    long_about = None
)]
#[command(version, after_help = FORMAT_HELP)]
struct Cli {
    /// Exit only when interrupt or terminate is received
    #[arg(short, long)]
    keep_running: bool,

    /// Do not output headers to stdout
    #[arg(short, long)]
    no_headers: bool,

    /// Configuration file path
    #[arg(short, long, env = "MEASUREMENT_EVENTS_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Flags given on the command line win over file and environment.
    fn apply(&self, config: &mut PipelineConfig) {
        if self.keep_running {
            config.keep_running = true;
        }
        if self.no_headers {
            config.no_headers = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout with a zero status.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprintln!("{}", usage_text(&e));
            std::process::exit(e.exit_code());
        }
    };

    let mut config =
        PipelineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    init_tracing(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let grace = Duration::from_millis(config.shutdown_grace_ms);
    let result = runtime.block_on(run(config));

    // A stdin read parked on the blocking pool never returns on its own.
    runtime.shutdown_timeout(grace);

    let summary = result?;
    info!(
        lines = summary.lines,
        samples = summary.samples,
        ignored = summary.ignored,
        rejected = summary.rejected,
        records = summary.records,
        "done"
    );
    Ok(())
}

/// The parse error's headline followed by the full help, formats included.
fn usage_text(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let headline = rendered.lines().next().unwrap_or_default();
    format!("{}\n\n{}", headline, Cli::command().render_help())
}

async fn run(config: PipelineConfig) -> anyhow::Result<PipelineSummary> {
    let pipeline = Pipeline::new(config);
    let signals = tokio::spawn(shutdown_signal(pipeline.cancellation_token()));

    let summary = pipeline
        .run(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr())
        .await
        .context("measurement pipeline failed");

    signals.abort();
    summary
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    // stdout carries event records only.
    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Cancel the pipeline on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        }
        _ = terminate => {
            info!("Received terminate signal, stopping");
        }
        _ = cancel.cancelled() => return,
    }

    cancel.cancel();
}
