use serde::Deserialize;

/// Main configuration structure for Image Trawler
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Size of the worker pool shared by page fetches and image downloads
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            user_agent: concat!("image-trawler/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Retry policy for GET requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff factor in seconds; retry n waits `factor * 2^(n-1)`
    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    /// Upper bound on any single retry delay (seconds)
    #[serde(rename = "backoff-max-secs")]
    pub backoff_max_secs: u64,

    /// HTTP statuses considered transient
    #[serde(rename = "retry-statuses")]
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            backoff_max_secs: 120,
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the mirrored image tree
    #[serde(rename = "image-dir")]
    pub image_dir: String,

    /// Path to the CSV manifest
    #[serde(rename = "manifest-path")]
    pub manifest_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_dir: "images".to_string(),
            manifest_path: "image_data.csv".to_string(),
        }
    }
}

/// Image store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Extensions (with leading dot) that are never downloaded
    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Vec<String>,

    /// Rename the later of two distinct images that map to the same file
    #[serde(rename = "disambiguate-collisions")]
    pub disambiguate_collisions: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            excluded_extensions: vec![".svg".to_string(), ".gif".to_string()],
            disambiguate_collisions: true,
        }
    }
}
