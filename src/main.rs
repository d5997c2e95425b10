use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use monkeytest::bench::{Benchmark, BenchmarkReport, ChannelObserver, NoProgress, ProgressUpdate};
use monkeytest::cli::Cli;
use monkeytest::config::Settings;
use monkeytest::error::{exit_code, user_friendly_message};
use monkeytest::report::{render_text, write_json};
use monkeytest::util::format_bytes;
use monkeytest::{BenchError, Result};

/// At most 101 updates per pass; anything beyond this is dropped, not queued
const PROGRESS_CHANNEL_CAPACITY: usize = 128;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Benchmark failed");
            eprintln!("Error: {}", user_friendly_message(&e));
            ExitCode::from(exit_code(&e))
        }
    }
}

/// `RUST_LOG` wins; otherwise debug with `--verbose`, warnings only without
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let config = cli.to_config(&settings)?;
    config.validate()?;

    info!(
        target = %config.target_path.display(),
        size = %format_bytes(config.total_size),
        write_block = %format_bytes(config.effective_write_block_size()),
        read_block = %format_bytes(config.effective_read_block_size()),
        cache_drop = config.cache_drop.description(),
        fill = config.fill.description(),
        "Starting benchmark"
    );

    let benchmark = Benchmark::new(config);
    let report = if cli.no_progress {
        join(tokio::task::spawn_blocking(move || benchmark.run(&mut NoProgress)).await)?
    } else {
        run_with_progress(benchmark).await?
    };

    info!(
        elapsed = %humantime::format_duration(Duration::from_millis(report.elapsed.as_millis() as u64)),
        direct_io = report.direct_io,
        cache = report.cache.description(),
        fill = report.fill.description(),
        warnings = report.warnings.len(),
        "Benchmark complete"
    );

    match &cli.json {
        Some(path) => write_json(path, &report.summary)?,
        None => print!("{}", render_text(&report.summary)),
    }

    Ok(())
}

/// Run on a blocking thread while an async task draws the progress bar
async fn run_with_progress(benchmark: Benchmark) -> Result<BenchmarkReport> {
    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(PROGRESS_CHANNEL_CAPACITY);

    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} {msg:8} [{bar:40}] {pos}/{len} blocks ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }

    let ui = tokio::spawn(async move {
        let mut phase = None;
        while let Some(update) = rx.recv().await {
            if phase != Some(update.phase) {
                phase = Some(update.phase);
                bar.reset();
                bar.set_length(update.total);
                bar.set_message(update.phase.description());
            }
            bar.set_position(update.completed);
        }
        bar.finish_and_clear();
    });

    let result = tokio::task::spawn_blocking(move || {
        let mut observer = ChannelObserver(tx);
        benchmark.run(&mut observer)
    })
    .await;

    ui.await.ok();
    join(result)
}

fn join(result: std::result::Result<Result<BenchmarkReport>, tokio::task::JoinError>) -> Result<BenchmarkReport> {
    result.map_err(|e| {
        BenchError::IoError(io::Error::new(io::ErrorKind::Other, format!("benchmark task failed: {}", e)))
    })?
}
