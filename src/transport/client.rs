//! reqwest-backed implementation of [`HttpTransport`].
//!
//! The client is created once and shared by every worker so that connection
//! pooling is reused across requests.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::{HttpTransport, ResponseBody, TransportError};
use crate::request::{Body, Method, Request};

/// Settings for [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds, unless a request sets its own.
    pub read_timeout_secs: u64,
    /// Treat non-2xx responses as failed attempts.
    pub error_for_status: bool,
    /// User-Agent override.
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            error_for_status: false,
            user_agent: None,
        }
    }
}

/// HTTP client for executing request descriptors.
///
/// # Example
///
/// ```no_run
/// use concurrent_requests::transport::{HttpClient, HttpClientConfig};
///
/// let config = HttpClientConfig {
///     error_for_status: true,
///     ..HttpClientConfig::default()
/// };
/// let client = HttpClient::from_config(&config)?;
/// # Ok::<(), reqwest::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    error_for_status: bool,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default timeouts (30s connect, 5min read), gzip
    /// enabled, and error statuses passed through as successful responses.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::from_config(&HttpClientConfig::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or resolver cannot
    /// be initialised.
    #[instrument(level = "debug")]
    pub fn from_config(config: &HttpClientConfig) -> Result<Self, reqwest::Error> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(default_user_agent);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            error_for_status: config.error_for_status,
        })
    }

    /// Whether non-2xx responses fail the attempt.
    #[must_use]
    pub fn error_for_status(&self) -> bool {
        self.error_for_status
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn build_request(&self, request: &Request) -> Result<RequestBuilder, TransportError> {
        let url = build_url(request)?;
        let mut builder = self.client.request(to_reqwest_method(request.method()), url);

        for (name, value) in request.headers() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::invalid_header(request.url(), name))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::invalid_header(request.url(), name))?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(timeout) = request.request_options().timeout {
            builder = builder.timeout(timeout);
        }

        Ok(match request.body() {
            None => builder,
            Some(Body::Bytes(bytes)) => builder.body(bytes.clone()),
            Some(Body::Text(text)) => builder.body(text.clone()),
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Form(fields)) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish();
                builder
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(encoded)
            }
        })
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn execute(&self, request: &Request) -> Result<ResponseBody, TransportError> {
        let builder = self.build_request(request)?;

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(request.url(), e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");

        if self.error_for_status && !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(TransportError::http_status_with_retry_after(
                request.url(),
                status.as_u16(),
                retry_after,
            ));
        }

        let url = request.url().to_string();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| TransportError::from_reqwest(&url, e)))
            .boxed();

        Ok(ResponseBody::new(status.as_u16(), stream))
    }
}

/// Parses the descriptor URL and appends its query parameters.
fn build_url(request: &Request) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(request.url()).map_err(|_| TransportError::invalid_url(request.url()))?;
    if !request.params().is_empty() {
        url.query_pairs_mut().extend_pairs(request.params());
    }
    Ok(url)
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("concurrent-requests/{version}")
}
