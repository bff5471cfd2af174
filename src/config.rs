use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::discogs::http::HttpClientConfig;
use crate::import::DEFAULT_PAGE_SIZE;

/// Library configuration, read from `DISCOLLECT_*` environment variables.
/// In dev setups a `.env` file is picked up first.
#[derive(Clone, Debug)]
pub struct Config {
    /// Sent on every API call; Discogs rejects requests without one.
    pub user_agent: String,
    /// Personal access token, if the user has signed in.
    pub token: Option<String>,
    /// Where the local collection database lives.
    pub database_path: PathBuf,
    /// Items per page when walking collection folders.
    pub page_size: usize,
    pub http_timeout: Duration,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: concat!("discollect/", env!("CARGO_PKG_VERSION")).to_string(),
            token: None,
            database_path: default_database_path(),
            page_size: DEFAULT_PAGE_SIZE,
            http_timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn load() -> Self {
        if dotenvy::dotenv().is_ok() {
            info!("Config: loaded .env file");
        }

        let defaults = Config::default();

        Config {
            user_agent: std::env::var("DISCOLLECT_USER_AGENT").unwrap_or(defaults.user_agent),
            token: std::env::var("DISCOLLECT_TOKEN").ok(),
            database_path: std::env::var("DISCOLLECT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            page_size: std::env::var("DISCOLLECT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.page_size),
            http_timeout: std::env::var("DISCOLLECT_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            max_retries: std::env::var("DISCOLLECT_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    /// HTTP client configuration derived from this config.
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.http_timeout,
            max_retries: self.max_retries,
            ..HttpClientConfig::default()
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".discollect")
        .join("collection.db")
}
