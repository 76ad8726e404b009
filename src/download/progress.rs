//! Progress reporting seam.
//!
//! The coordinator attaches an observer to the direct-copy and on-disk HLS
//! paths; in-memory downloads never report progress. Rendering is left to the
//! implementor. An implementation for [`indicatif::ProgressBar`] is provided.

use indicatif::{ProgressBar, ProgressStyle};

/// Observer receiving byte counts as they are written to the sink.
///
/// Implementations must be cheap to call per chunk. HLS downloads advance the
/// observer once per written segment, so bytes of failed segments never count.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first byte, with the expected total when known.
    fn start(&self, total: Option<u64>);

    /// Called with the number of bytes just written to the sink.
    fn advance(&self, bytes: u64);

    /// Called once when writing stops, after success or failure.
    fn finish(&self);
}

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({bytes_per_sec})";

impl ProgressObserver for ProgressBar {
    fn start(&self, total: Option<u64>) {
        match total {
            Some(len) => {
                self.set_length(len);
                self.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
            }
            None => {
                self.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
            }
        }
        self.reset_elapsed();
    }

    fn advance(&self, bytes: u64) {
        self.inc(bytes);
    }

    fn finish(&self) {
        ProgressBar::finish(self);
    }
}
