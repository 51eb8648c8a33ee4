//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - UTM tagging of outgoing requests
//! - Redirect handling
//! - Error classification

use crate::config::{TrackingConfig, UserAgentConfig};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Redirect hops the transport follows before giving up
pub const MAX_REDIRECTS: usize = 10;

/// Raw response handed back by a transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code of the final response
    pub status: u16,
    /// URL of the final response, after any redirects the transport followed
    pub final_url: String,
    /// Response body
    pub body: String,
}

/// Failures raised by a transport before a response is available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("network error: {0}")]
    Network(String),
}

/// One HTTP GET, abstracted so the crawl loop can run against any site
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError>;
}

/// Transport backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(classify_error)?;

        Ok(TransportResponse {
            status,
            final_url,
            body,
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_redirect() {
        TransportError::TooManyRedirects
    } else {
        TransportError::Network(error.to_string())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Bound on every request, connection included
///
/// # Example
///
/// ```no_run
/// use site_archiver::config::UserAgentConfig;
/// use site_archiver::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteArchiver".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A page whose content is usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Normalized URL the fetch was issued for
    pub url: String,
    /// URL the content was served from
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Why a URL produced no usable content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("timeout")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("HTTP {0}")]
    HttpError(u16),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<TransportError> for FetchFailure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout => Self::Timeout,
            TransportError::TooManyRedirects => Self::TooManyRedirects,
            TransportError::Network(message) => Self::NetworkError(message),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// 2xx served directly
    Ok(FetchedPage),
    /// Content reached through a redirect
    Redirected(FetchedPage),
    Failed(FetchFailure),
}

impl FetchResult {
    /// The usable page, if any
    pub fn page(&self) -> Option<&FetchedPage> {
        match self {
            Self::Ok(page) | Self::Redirected(page) => Some(page),
            Self::Failed(_) => None,
        }
    }
}

/// UTM values appended to outgoing requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtmTags {
    pub source: String,
    pub medium: String,
    pub campaign: String,
}

impl UtmTags {
    /// Resolves the configured tags; the campaign defaults to the current `YYYY-MM`
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            source: config.utm_source.clone(),
            medium: config.utm_medium.clone(),
            campaign: config
                .utm_campaign
                .clone()
                .unwrap_or_else(|| Utc::now().format("%Y-%m").to_string()),
        }
    }
}

/// Fetches normalized URLs through a transport
///
/// Tagging only touches the outgoing request; the normalized URL carried in
/// the result is the one that was asked for.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    tags: UtmTags,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, tags: UtmTags) -> Self {
        Self { transport, tags }
    }

    /// The URL actually requested for `url`
    pub fn tagged_url(&self, url: &str) -> Option<Url> {
        let mut tagged = Url::parse(url).ok()?;
        tagged
            .query_pairs_mut()
            .append_pair("utm_source", &self.tags.source)
            .append_pair("utm_medium", &self.tags.medium)
            .append_pair("utm_campaign", &self.tags.campaign);
        Some(tagged)
    }

    /// Fetches one normalized URL
    ///
    /// | Outcome | Result |
    /// |---------|--------|
    /// | 2xx at the requested URL | `Ok` |
    /// | 2xx after the transport followed redirects | `Redirected` |
    /// | 301/302 returned as-is | `Redirected` |
    /// | Any other status | `Failed(HttpError)` |
    /// | Timeout | `Failed(Timeout)` |
    /// | Redirect limit exceeded | `Failed(TooManyRedirects)` |
    /// | Anything else | `Failed(NetworkError)` |
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let Some(request_url) = self.tagged_url(url) else {
            return FetchResult::Failed(FetchFailure::NetworkError(format!(
                "cannot request malformed URL {}",
                url
            )));
        };

        let response = match self.transport.get(&request_url).await {
            Ok(response) => response,
            Err(error) => return FetchResult::Failed(error.into()),
        };

        let redirected = response.final_url != request_url.as_str();
        let page = FetchedPage {
            url: url.to_string(),
            final_url: response.final_url,
            status: response.status,
            body: response.body,
        };

        match page.status {
            200..=299 if redirected => FetchResult::Redirected(page),
            200..=299 => FetchResult::Ok(page),
            301 | 302 => FetchResult::Redirected(page),
            status => FetchResult::Failed(FetchFailure::HttpError(status)),
        }
    }
}
