//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use trackfetch::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_SEGMENT_CONCURRENCY, READ_TIMEOUT_SECS,
};

/// Download an audio track, assembling HLS playlists into a single file.
#[derive(Parser, Debug)]
#[command(name = "trackfetch")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the progressive file (low quality) or the HLS media playlist
    pub url: String,

    /// Track title used for the output file name
    #[arg(short, long)]
    pub title: String,

    /// Quality tier; `low` is a direct download, anything else is HLS
    #[arg(long, default_value = "low")]
    pub quality: String,

    /// Output file extension
    #[arg(short, long, default_value = "mp3")]
    pub ext: String,

    /// Directory to save into (a leading `~` is expanded)
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Write the track to stdout instead of a file
    #[arg(long, conflicts_with = "output_dir")]
    pub to_stdout: bool,

    /// Maximum concurrent segment fetches (1-32)
    #[arg(short = 'c', long, default_value_t = DEFAULT_SEGMENT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: u8,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
