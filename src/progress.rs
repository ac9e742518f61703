//! Progress bar for CLI runs.

use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use concurrent_requests::{Request, RequestEvent, RequestObserver};

/// Observer that drives an `indicatif` progress bar.
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub(crate) fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl RequestObserver for ProgressObserver {
    fn observe(&self, event: &RequestEvent<'_>) {
        match event {
            RequestEvent::Start { total } => {
                self.bar.set_length(u64::try_from(*total).unwrap_or(u64::MAX));
                self.bar.set_message("requesting...");
            }
            RequestEvent::Success { request } => {
                self.bar.inc(1);
                self.bar.set_message(format!("done {}", host_of(request)));
            }
            RequestEvent::Retry { request, .. } => {
                self.bar.set_message(format!(
                    "retrying {} (attempt {})",
                    host_of(request),
                    request.attempts() + 1
                ));
            }
            RequestEvent::Exhausted { request, .. } => {
                self.bar.inc(1);
                self.bar.set_message(format!("failed {}", host_of(request)));
            }
            RequestEvent::End { .. } => self.bar.finish_and_clear(),
        }
    }
}

fn host_of(request: &Request) -> String {
    Url::parse(request.url())
        .ok()
        .and_then(|url| url.host_str().map(ToString::to_string))
        .unwrap_or_else(|| request.url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concurrent_requests::RunSummary;

    #[test]
    fn test_host_of_falls_back_to_raw_url() {
        assert_eq!(host_of(&Request::get("https://example.com/a?b=c")), "example.com");
        assert_eq!(host_of(&Request::get("not a url")), "not a url");
    }

    #[test]
    fn test_progress_counts_terminal_events() {
        let observer = ProgressObserver::with_bar(ProgressBar::hidden());
        let request = Request::get("https://example.com/a");

        observer.observe(&RequestEvent::Start { total: 2 });
        observer.observe(&RequestEvent::Success { request: &request });
        assert_eq!(observer.bar.position(), 1);
        assert_eq!(observer.bar.length(), Some(2));

        observer.observe(&RequestEvent::End {
            summary: &RunSummary::default(),
        });
        assert!(observer.bar.is_finished());
    }
}
