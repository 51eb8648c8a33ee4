use serde::Deserialize;

/// Main configuration structure for Site-Archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Starting URLs, used only when no pending checkpoint exists
    #[serde(default)]
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages archived in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Number of concurrent crawl workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Scheme every normalized URL is forced to
    #[serde(rename = "canonical-scheme", default = "default_canonical_scheme")]
    pub canonical_scheme: String,

    /// Optional wall-clock budget for the whole run (seconds)
    #[serde(rename = "max-duration-secs", default)]
    pub max_duration_secs: Option<u64>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// UTM tags appended to every outgoing request
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(rename = "utm-source", default = "default_utm_source")]
    pub utm_source: String,

    #[serde(rename = "utm-medium", default = "default_utm_medium")]
    pub utm_medium: String,

    /// Campaign tag; the current `YYYY-MM` period when unset
    #[serde(rename = "utm-campaign", default)]
    pub utm_campaign: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            utm_source: default_utm_source(),
            utm_medium: default_utm_medium(),
            utm_campaign: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving one HTML file per visited URL
    #[serde(rename = "archive-dir")]
    pub archive_dir: String,

    /// Directory receiving the extractor's text files
    #[serde(rename = "text-dir", default = "default_text_dir")]
    pub text_dir: String,
}

fn default_workers() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    10
}

fn default_canonical_scheme() -> String {
    "https".to_string()
}

fn default_utm_source() -> String {
    "analyse".to_string()
}

fn default_utm_medium() -> String {
    "crawl_scrap".to_string()
}

fn default_text_dir() -> String {
    "./data/text_pages".to_string()
}
