//! CLI entry point for trackfetch.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trackfetch::{
    DownloadConfig, DownloadReport, DownloadRequest, DownloadStatus, Downloader,
    ProgressObserver, Quality,
};

mod cli;

use cli::Args;

/// Exit code when the track was written with missing segments.
const EXIT_INCOMPLETE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so `--to-stdout` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = DownloadConfig::default()
        .with_segment_concurrency(usize::from(args.concurrency))
        .with_timeouts(args.connect_timeout, args.read_timeout);

    let cancel = CancellationToken::new();
    let downloader = Downloader::with_cancellation(config, cancel.clone())?;
    spawn_ctrl_c_handler(cancel);

    let quality = Quality::new(args.quality.as_str());
    let request = DownloadRequest::new(&args.url, &args.title, quality, &args.ext);

    let report = if args.to_stdout {
        let mut buffer = Vec::new();
        let report = downloader.download_to_buffer(&request, &mut buffer).await?;
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(&buffer)
            .and_then(|()| stdout.flush())
            .context("failed to write track to stdout")?;
        report
    } else {
        let progress: Option<Arc<dyn ProgressObserver>> = if args.quiet {
            None
        } else {
            let bar = ProgressBar::new(0).with_message("Downloading");
            Some(Arc::new(bar))
        };
        downloader
            .download_to_dir(&request, &args.output_dir, progress)
            .await?
    };

    Ok(summarize(&report))
}

/// Cancels in-flight downloads on the first Ctrl-C.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling download");
            cancel.cancel();
        }
    });
}

fn summarize(report: &DownloadReport) -> ExitCode {
    if let Some(path) = &report.path {
        info!(path = %path.display(), bytes = report.bytes_written, "saved");
    }

    match report.status() {
        DownloadStatus::Complete => ExitCode::SUCCESS,
        DownloadStatus::Empty => {
            warn!("manifest listed no segments; nothing was saved");
            ExitCode::SUCCESS
        }
        DownloadStatus::Partial | DownloadStatus::Failed => {
            for failure in &report.failed_segments {
                warn!(
                    index = failure.index,
                    uri = %failure.uri,
                    error = %failure.error,
                    "missing segment"
                );
            }
            warn!(
                missing = report.failed_segments.len(),
                total = report.segments_total,
                "track is incomplete"
            );
            ExitCode::from(EXIT_INCOMPLETE)
        }
    }
}
