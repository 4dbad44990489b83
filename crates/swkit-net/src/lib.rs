//! # swkit Net
//!
//! The network boundary of the swkit caching engine: a small request/response
//! model, a `Fetcher` trait the fetch strategies are written against, and a
//! reqwest-backed implementation.
//!
//! ## Design Goals
//!
//! 1. **Snapshot responses**: bodies are fully read into `Bytes` so a response
//!    can be captured into the cache and returned to the caller at the same time
//! 2. **Pluggable transport**: strategies only see the `Fetcher` trait, so unit
//!    tests can script failures, delays, and statuses
//! 3. **GET-centric**: cache identity is method + URL; only GET responses are
//!    ever captured

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

/// Errors that can occur in networking.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How a request reaches the network, mirroring the browser request modes the
/// router and strategies care about. Only `Navigate` changes behavior: failed
/// navigations fall back to the offline page instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// A top-level page navigation.
    Navigate,
    /// An ordinary subresource request.
    #[default]
    Cors,
    /// Same-origin-only subresource request.
    SameOrigin,
}

/// HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            mode: RequestMode::default(),
            timeout: None,
        }
    }

    /// Create a navigation (page-load) request.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a per-request timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Whether this request is a page navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Canonical cache identity: method plus full URL, exact match only.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// HTTP response snapshot.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Check if the response indicates success (2xx).
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Get the body as text.
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| NetError::RequestFailed(e.to_string()))
    }

    /// Get the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::RequestFailed(e.to_string()))
    }
}

/// Transport abstraction the fetch strategies run against.
pub trait Fetcher: Send + Sync {
    /// Perform the request and return a fully-read response snapshot.
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, NetError>>;
}

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User agent string.
    pub user_agent: String,
    /// Accept-Language header.
    pub accept_language: String,
    /// Default timeout applied when the request carries none.
    pub default_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "swkit/0.1".to_string(),
            accept_language: "pt-BR,pt;q=0.9,en;q=0.8".to_string(),
            default_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    /// Create a new fetcher.
    pub fn new(config: FetcherConfig) -> Result<Self, NetError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, NetError>> {
        let client = self.client.clone();
        let accept_language = self.config.accept_language.clone();
        let timeout = request.timeout.unwrap_or(self.config.default_timeout);

        Box::pin(async move {
            debug!(url = %request.url, method = %request.method, "fetching");

            let mut builder = client
                .request(request.method.clone(), request.url.clone())
                .timeout(timeout)
                .header("Accept-Language", &accept_language);

            for (name, value) in request.headers.iter() {
                builder = builder.header(name, value);
            }

            let response = builder.send().await?;

            let status = response.status();
            let headers = response.headers().clone();
            let url = response.url().clone();
            let body = response.bytes().await?;

            trace!(
                url = %url,
                status = %status,
                body_len = body.len(),
                "response received"
            );

            Ok(Response {
                url,
                status,
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn cache_key_is_method_and_url() {
        let url = Url::parse("https://example.com/admin/dashboard").unwrap();
        let request = Request::get(url);
        assert_eq!(request.cache_key(), "GET https://example.com/admin/dashboard");
    }

    #[test]
    fn navigation_mode() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(Request::navigate(url.clone()).is_navigation());
        assert!(!Request::get(url).is_navigation());
    }

    #[tokio::test]
    async fn http_fetcher_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/menu"))
            .respond_with(ResponseTemplate::new(200).set_body_string("burgers"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/menu", server.uri())).unwrap();
        let response = fetcher.fetch(Request::get(url)).await.unwrap();

        assert!(response.ok());
        assert_eq!(response.text().unwrap(), "burgers");
    }

    #[tokio::test]
    async fn http_fetcher_surfaces_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let response = fetcher.fetch(Request::get(url)).await.unwrap();

        assert!(!response.ok());
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn per_request_timeout_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let request = Request::get(url).timeout(Duration::from_millis(100));

        let result = fetcher.fetch(request).await;
        assert!(result.is_err());
    }
}
