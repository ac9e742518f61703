//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use concurrent_requests::{Config, RetryOn, SinkKind};

/// Run many HTTP requests with a bounded worker pool.
///
/// Requests come from positional URLs (GET), a JSON request file, or stdin
/// (one URL per line). Bodies are printed to stdout in input order, or
/// written to files with --output-dir.
#[derive(Parser, Debug)]
#[command(name = "concurrent-requests")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to GET
    pub urls: Vec<String>,

    /// JSON file with a list of request objects
    #[arg(long, value_name = "FILE")]
    pub requests: Option<PathBuf>,

    /// JSON configuration file (flags override its values)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of concurrent workers (1-1024)
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u16).range(1..=1024))]
    pub workers: Option<u16>,

    /// Attempts per request including the first (1-100)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_attempts: Option<u32>,

    /// Pause each worker takes after a request, in milliseconds (max 60000)
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay_ms: Option<u64>,

    /// Write bodies into this directory instead of printing them
    ///
    /// Requests without a `file_name` are saved as `NNNN-<last URL segment>`
    /// (NNNN is the request's position). A name already used by another
    /// request gets a `.1`, `.2`, ... suffix.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Retry only timeouts, disconnects and 408/429/5xx responses
    #[arg(long)]
    pub transient_only: bool,

    /// Treat non-2xx responses as failed attempts
    #[arg(long)]
    pub error_for_status: bool,

    /// Exit with an error if any request failed
    #[arg(long)]
    pub strict: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Applies flag overrides on top of file/default configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.executor.workers = usize::from(workers);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.executor.max_attempts = max_attempts;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.executor.delay_ms = delay_ms;
        }
        if self.transient_only {
            config.executor.retry_on = RetryOn::TransientOnly;
        }
        if self.error_for_status {
            config.http.error_for_status = true;
        }
        if let Some(directory) = &self.output_dir {
            config.executor.sink = SinkKind::File {
                directory: directory.clone(),
                chunk_size: None,
            };
        }
    }
}
