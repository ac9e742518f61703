//! One-shot batch downloader.
//!
//! [`BatchDownload`] is the quick path for "fetch these GETs and give me the
//! bytes": it builds the descriptors, streams every body into a temporary
//! directory through a [`FileSink`], reads the files back in request order and
//! removes the directory.
//!
//! # Broadcasting
//!
//! URL, query parameters and headers are each a [`Broadcast`]. When every
//! argument is [`Broadcast::One`] a single request is issued. Otherwise single
//! values repeat for every request and the [`Broadcast::Many`] sequences are
//! zipped; the shortest sequence decides the request count.
//!
//! # Example
//!
//! ```no_run
//! use concurrent_requests::download::{BatchDownload, Broadcast};
//!
//! # async fn example() -> Result<(), concurrent_requests::download::DownloadAllError> {
//! let pages = (1..=3).map(|n| vec![("page".to_string(), n.to_string())]).collect();
//! let bodies = BatchDownload::new("https://example.com/items")
//!     .params(Broadcast::Many(pages))
//!     .workers(3)
//!     .run()
//!     .await?;
//! assert_eq!(bodies.len(), 3);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::executor::{Executor, ExecutorError};
use crate::observer::{NoopObserver, RequestObserver};
use crate::request::{Request, RequestFailure};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryOn};
use crate::sink::{DEFAULT_CHUNK_SIZE, FileSink};
use crate::transport::{HttpClient, HttpClientConfig, HttpTransport};

/// Default worker count for batch downloads.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 10;

/// Default total timeout per request (5 minutes).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Query parameter or header pairs for one request.
pub type Pairs = Vec<(String, String)>;

/// A value shared by every request, or one value per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast<T> {
    /// Repeated for every request.
    One(T),
    /// Zipped with the other sequences.
    Many(Vec<T>),
}

impl<T: Default> Default for Broadcast<T> {
    fn default() -> Self {
        Self::One(T::default())
    }
}

impl<T: Clone> Broadcast<T> {
    /// Value for request `index`, if the sequence reaches that far.
    fn nth(&self, index: usize) -> Option<T> {
        match self {
            Self::One(value) => Some(value.clone()),
            Self::Many(values) => values.get(index).cloned(),
        }
    }

    /// Sequence length, or `None` for a repeated value.
    fn sequence_len(&self) -> Option<usize> {
        match self {
            Self::One(_) => None,
            Self::Many(values) => Some(values.len()),
        }
    }
}

/// Errors that fail a whole batch download.
#[derive(Debug, Error)]
pub enum DownloadAllError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The temporary directory could not be created.
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),

    /// The executor refused to run.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A request ran out of attempts.
    #[error(transparent)]
    Failed(#[from] RequestFailure),

    /// A downloaded file could not be read back.
    #[error("failed to read downloaded body {path}: {source}")]
    Read {
        /// Path of the temporary file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Builder-style batch of GET requests downloaded through temporary files.
pub struct BatchDownload {
    urls: Broadcast<String>,
    params: Broadcast<Pairs>,
    headers: Broadcast<Pairs>,
    workers: usize,
    delay: Option<Duration>,
    timeout: Duration,
    max_attempts: u32,
    transport: Option<Arc<dyn HttpTransport>>,
    observer: Arc<dyn RequestObserver>,
}

impl std::fmt::Debug for BatchDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDownload")
            .field("urls", &self.urls)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("workers", &self.workers)
            .field("delay", &self.delay)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl BatchDownload {
    /// Downloads a single URL, or repeats it when other arguments are
    /// sequences.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_urls(Broadcast::One(url.into()))
    }

    /// Downloads with an explicit URL broadcast.
    #[must_use]
    pub fn with_urls(urls: Broadcast<String>) -> Self {
        Self {
            urls,
            params: Broadcast::default(),
            headers: Broadcast::default(),
            workers: DEFAULT_DOWNLOAD_WORKERS,
            delay: None,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transport: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Downloads every URL in `urls`.
    pub fn many<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_urls(Broadcast::Many(urls.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn params(mut self, params: Broadcast<Pairs>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: Broadcast<Pairs>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total timeout applied to each request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Uses `transport` instead of a fresh [`HttpClient`] that treats error
    /// statuses as failures.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Expands the broadcast arguments into GET descriptors.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        let count = [
            self.urls.sequence_len(),
            self.params.sequence_len(),
            self.headers.sequence_len(),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(1);

        (0..count)
            .filter_map(|index| {
                let url = self.urls.nth(index)?;
                let params = self.params.nth(index)?;
                let headers = self.headers.nth(index)?;
                let request = params
                    .into_iter()
                    .fold(Request::get(url), |request, (name, value)| {
                        request.with_param(name, value)
                    });
                let request = headers
                    .into_iter()
                    .fold(request, |request, (name, value)| request.with_header(name, value));
                Some(
                    request
                        .with_timeout(self.timeout)
                        .save_as(format!("response-{index:06}")),
                )
            })
            .collect()
    }

    /// Downloads every request and returns the bodies in request order.
    ///
    /// Only transient failures (timeouts, disconnects, 408/429/5xx) are
    /// retried.
    ///
    /// # Errors
    ///
    /// Fails with [`DownloadAllError::Failed`] if any request runs out of
    /// attempts, or with the setup error that prevented the run.
    #[instrument(skip(self), fields(workers = self.workers))]
    pub async fn run(self) -> Result<Vec<Bytes>, DownloadAllError> {
        let requests = self.requests();
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let config = HttpClientConfig {
                    error_for_status: true,
                    ..HttpClientConfig::default()
                };
                Arc::new(HttpClient::from_config(&config).map_err(DownloadAllError::Client)?)
            }
        };

        let temp_dir = TempDir::new().map_err(DownloadAllError::TempDir)?;
        let sink = FileSink::new(temp_dir.path()).with_chunk_size(DEFAULT_CHUNK_SIZE);
        debug!(
            requests = requests.len(),
            directory = %temp_dir.path().display(),
            "starting batch download"
        );

        let mut builder = Executor::builder(transport, requests)
            .workers(self.workers)
            .max_attempts(self.max_attempts)
            .retry_on(RetryOn::TransientOnly)
            .sink(Arc::new(sink.clone()))
            .observer(self.observer);
        if let Some(delay) = self.delay {
            builder = builder.delay(delay);
        }
        let mut executor = builder.build()?;
        executor.run().await?;
        executor.raise_for_status()?;

        let mut bodies = Vec::with_capacity(executor.requests().len());
        for request in executor.requests() {
            let path = sink
                .destination_path(request)
                .map_err(|e| DownloadAllError::Executor(ExecutorError::Configuration(e)))?;
            let body = tokio::fs::read(&path)
                .await
                .map_err(|source| DownloadAllError::Read { path, source })?;
            bodies.push(Bytes::from(body));
        }
        Ok(bodies)
    }
}
