//! Service configuration
//!
//! Environment Variables:
//!   API_BASE_URL           - Upstream feed base URL (default: http://localhost:3000)
//!   API_MAX_RETRIES        - Max synchronized fetch attempts per cycle (default: 5)
//!   API_RETRY_DELAY        - Fixed delay between attempts in ms (default: 1000)
//!   API_REQUEST_TIMEOUT_MS - Per-request HTTP timeout in ms (default: 5000)
//!   POLL_INTERVAL_MS       - Cycle trigger interval in ms (default: 1000)
//!   PORT                   - Listen port for /client/state (default: 3001)

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing or unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Total attempts per cycle; at least one
        let max_retries = lookup("API_MAX_RETRIES")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(|v| v.max(1))
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let retry_delay_ms = lookup("API_RETRY_DELAY")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        let request_timeout_ms = lookup("API_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        let poll_interval_ms = lookup("POLL_INTERVAL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let port = lookup("PORT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            base_url,
            max_retries,
            retry_delay_ms,
            request_timeout_ms,
            poll_interval_ms,
            port,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_BASE_URL", "http://feed.internal:8080/"),
            ("API_MAX_RETRIES", "3"),
            ("API_RETRY_DELAY", "250"),
            ("POLL_INTERVAL_MS", "2000"),
            ("PORT", "9000"),
        ]));

        assert_eq!(config.base_url, "http://feed.internal:8080");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 250);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_unparseable_retries_use_default() {
        let config = Config::from_lookup(lookup_from(&[("API_MAX_RETRIES", "many")]));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_garbage_falls_back_to_defaults_and_zero_retries_clamp() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_MAX_RETRIES", "0"),
            ("API_RETRY_DELAY", "soon"),
            ("PORT", "99999"),
        ]));

        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
