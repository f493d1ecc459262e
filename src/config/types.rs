use serde::Deserialize;

/// Main configuration structure for Repo-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Access token; the command line and `GITHUB_TOKEN` take precedence
    #[serde(default)]
    pub token: Option<String>,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Fallback wait (seconds) before the single retry of a failed call
    #[serde(rename = "cooldown-secs", default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

/// Search-space configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Package signature searched for in code
    #[serde(default = "default_signature")]
    pub signature: String,

    /// Filename the signature must appear in
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Lower bound of the file-size domain
    #[serde(rename = "domain-from", default)]
    pub domain_from: i64,

    /// Upper bound of the file-size domain
    #[serde(rename = "domain-to", default = "default_domain_to")]
    pub domain_to: i64,

    /// Maximum number of results a single query can enumerate
    #[serde(rename = "result-cap", default = "default_result_cap")]
    pub result_cap: u64,

    /// Results per search page
    #[serde(rename = "per-page", default = "default_per_page")]
    pub per_page: u32,

    /// Last page number the API will serve
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Qualifier used to split a single-size window that is still over the cap
    #[serde(rename = "fallback-qualifier", default = "default_fallback_qualifier")]
    pub fallback_qualifier: String,
}

/// Per-repository crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Source-file extension whose basenames become `Classname` keywords
    #[serde(rename = "source-extension", default = "default_source_extension")]
    pub source_extension: String,

    /// Optional replacement for the built-in stop-word list
    #[serde(rename = "stopwords-path", default)]
    pub stopwords_path: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("repo-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_signature() -> String {
    "com.unity.xr".to_string()
}

fn default_filename() -> String {
    "manifest.json".to_string()
}

fn default_domain_to() -> i64 {
    50_000
}

fn default_result_cap() -> u64 {
    1000
}

fn default_per_page() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    10
}

fn default_fallback_qualifier() -> String {
    "path:packages".to_string()
}

fn default_source_extension() -> String {
    "cs".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            user_agent: default_user_agent(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            signature: default_signature(),
            filename: default_filename(),
            domain_from: 0,
            domain_to: default_domain_to(),
            result_cap: default_result_cap(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            fallback_qualifier: default_fallback_qualifier(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            stopwords_path: None,
        }
    }
}
