use serde::Deserialize;

/// Root configuration structure, loaded from a TOML file and then layered
/// with environment overrides (see [`super::env::apply_env_overrides`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default = "ClientConfig::with_defaults")]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            delay: DelayConfig::default(),
            planner: PlannerConfig::default(),
            user_agent: UserAgentConfig::default(),
            client: ClientConfig::with_defaults(),
        }
    }
}

/// Worker pool / run timeout tunables. See spec.md §6's `MORPH_MAX_WORKERS`,
/// `MORPH_TIMEOUT`, `MORPH_DISABLE_THREADS`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PoolConfig {
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(rename = "overall-timeout-secs", default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,
}

fn default_max_workers() -> usize {
    50
}

fn default_overall_timeout_secs() -> u64 {
    21_600
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            overall_timeout_secs: default_overall_timeout_secs(),
        }
    }
}

/// `AdaptiveDelay` bounds. See spec.md §6's `MORPH_MAX_LOAD`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DelayConfig {
    #[serde(rename = "min-delay", default = "default_min_delay")]
    pub min_delay: f64,

    #[serde(rename = "max-delay", default = "default_max_delay")]
    pub max_delay: f64,

    #[serde(rename = "max-load", default = "default_max_load")]
    pub max_load: u8,
}

fn default_min_delay() -> f64 {
    0.0
}

fn default_max_delay() -> f64 {
    30.0
}

fn default_max_load() -> u8 {
    20
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            max_load: default_max_load(),
        }
    }
}

/// `DateRangePlanner` tunables, named to match spec.md §4.B directly.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_days")]
    pub days: i64,

    #[serde(default = "default_everytime")]
    pub everytime: i64,

    #[serde(rename = "max-period", default = "default_max_period")]
    pub max_period: i64,
}

fn default_days() -> i64 {
    33
}

fn default_everytime() -> i64 {
    4
}

fn default_max_period() -> i64 {
    3
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            everytime: default_everytime(),
            max_period: default_max_period(),
        }
    }
}

/// Identity the HTTP client presents to remote servers. See spec.md §6's
/// user-agent format: `Mozilla/5.0 (compatible; ScraperUtils/<version>
/// <ISO-date>; +<project-url>)`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// Raw override template. The literal token `TODAY` is replaced with
    /// today's ISO date when the user-agent string is built (spec.md §6).
    /// `None` means build the default format from the fields above.
    #[serde(default)]
    pub template: Option<String>,
}

fn default_crawler_name() -> String {
    "ScraperUtils".to_string()
}

fn default_crawler_version() -> String {
    "1.0".to_string()
}

fn default_contact_url() -> String {
    "https://example.com/scraperutils".to_string()
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            template: None,
        }
    }
}

/// HTTP client behaviour. See spec.md §6's `MORPH_CLIENT_TIMEOUT`,
/// `MORPH_DISABLE_SSL_CHECK`, `MORPH_USE_PROXY`, `MORPH_AUSTRALIAN_PROXY`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "timeout-secs", default = "default_client_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "disable-ssl-check", default)]
    pub disable_ssl_check: bool,

    #[serde(rename = "use-proxy", default)]
    pub use_proxy: bool,

    #[serde(rename = "proxy-url", default)]
    pub proxy_url: Option<String>,
}

fn default_client_timeout_secs() -> u64 {
    60
}

impl ClientConfig {
    pub fn with_defaults() -> Self {
        Self {
            timeout_secs: default_client_timeout_secs(),
            disable_ssl_check: false,
            use_proxy: false,
            proxy_url: None,
        }
    }
}
