use std::env;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_FEED_PAGE_SIZE: u64 = 10;

/// Settings for the polling client in [`crate::client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub page_size: u64,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            page_size: DEFAULT_FEED_PAGE_SIZE,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("NOTIFY_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let poll_interval = env::var("NOTIFY_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let page_size = env::var("NOTIFY_FEED_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.page_size);

        Self {
            base_url,
            poll_interval,
            page_size,
            request_timeout: defaults.request_timeout,
        }
    }
}
