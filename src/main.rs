//! CLI entry point for concurrent-requests.

use std::collections::HashSet;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use concurrent_requests::{
    Config, Executor, HttpClient, Request, RequestEntry, RequestObserver, SinkKind,
    TracingObserver,
};
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::Args;
use progress::ProgressObserver;

#[tokio::main]
async fn main() -> Result<()> {
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

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    let mut requests = load_requests(&args)?;
    if requests.is_empty() {
        info!("No requests given. Pass URLs as arguments, --requests FILE, or pipe URLs via stdin.");
        return Ok(());
    }

    let persisting = matches!(config.executor.sink, SinkKind::File { .. });
    if persisting {
        name_unnamed(&mut requests);
    }

    let client = HttpClient::from_config(&config.http).context("failed to build HTTP client")?;
    let observer: Arc<dyn RequestObserver> = if args.progress && !args.quiet {
        Arc::new(ProgressObserver::new())
    } else {
        Arc::new(TracingObserver)
    };

    let mut executor = Executor::builder(Arc::new(client), requests)
        .config(config.executor)
        .observer(observer)
        .build()?;
    let summary = executor.run().await?;

    for request in executor.requests() {
        if let Some(failure) = request.error() {
            warn!(error = %failure, "request failed");
        }
    }

    if !persisting {
        let mut stdout = io::stdout().lock();
        for body in executor.collect(false)?.into_iter().flatten() {
            stdout.write_all(&body)?;
            if !body.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
        stdout.flush()?;
    }

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        retried = summary.retried,
        "Run complete"
    );

    if args.strict && summary.failed > 0 {
        bail!("{} of {} requests failed", summary.failed, summary.total);
    }
    Ok(())
}

/// Collects requests from the request file, positional URLs, or stdin.
fn load_requests(args: &Args) -> Result<Vec<Request>> {
    let mut requests = Vec::new();

    if let Some(path) = &args.requests {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?;
        let entries = RequestEntry::parse_list(&raw)
            .with_context(|| format!("invalid request file {}", path.display()))?;
        requests.extend(entries.into_iter().map(Request::from));
    }

    if !args.urls.is_empty() {
        requests.extend(args.urls.iter().map(Request::get));
    } else if args.requests.is_none() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        requests.extend(
            buffer
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(Request::get),
        );
    }

    Ok(requests)
}

/// Gives every request without a destination a name derived from its URL.
///
/// Derived names never reuse a name already set on another request.
fn name_unnamed(requests: &mut [Request]) {
    let mut taken: HashSet<String> = requests
        .iter()
        .filter_map(|request| request.file_name().map(ToString::to_string))
        .collect();
    for (index, request) in requests.iter_mut().enumerate() {
        if request.file_name().is_none() {
            let name = free_name(derived_file_name(index, request.url()), &taken);
            taken.insert(name.clone());
            *request = request.clone().save_as(name);
        }
    }
}

/// `name`, or `name.N` with the smallest N that is not taken.
fn free_name(name: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&name) {
        return name;
    }
    let mut suffix = 1_usize;
    loop {
        let candidate = format!("{name}.{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn derived_file_name(index: usize, url: &str) -> String {
    let segment = url::Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(ToString::to_string))
        })
        .filter(|segment| !segment.is_empty() && segment != "." && segment != "..");
    match segment {
        Some(segment) => format!("{index:04}-{segment}"),
        None => format!("{index:04}"),
    }
}
