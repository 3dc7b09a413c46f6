use std::time::Duration;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Settings for the FMP client. Defaults match the free-tier limits
/// (5 calls/minute, 250 calls/day).
#[derive(Debug, Clone)]
pub struct FmpConfig {
    pub base_url: String,
    /// Process-default API key, used when the caller does not supply one.
    pub api_key: Option<String>,
    pub per_minute_limit: u32,
    pub daily_limit: u32,
    /// Base backoff after a 429; scaled by the attempt number.
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub request_timeout: Duration,
}

impl Default for FmpConfig {
    fn default() -> Self {
        Self {
            base_url: FMP_BASE_URL.to_string(),
            api_key: None,
            per_minute_limit: 5,
            daily_limit: 250,
            retry_delay: Duration::from_secs(60),
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl FmpConfig {
    /// Build a config from environment variables, falling back to defaults:
    /// `FMP_API_KEY`, `FMP_RATE_LIMIT_PER_MINUTE`, `FMP_RATE_LIMIT_PER_DAY`,
    /// `FMP_RETRY_DELAY` (seconds).
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FMP_API_KEY").ok().filter(|k| !k.is_empty()),
            per_minute_limit: env_parse("FMP_RATE_LIMIT_PER_MINUTE", 5),
            daily_limit: env_parse("FMP_RATE_LIMIT_PER_DAY", 250),
            retry_delay: Duration::from_secs(env_parse("FMP_RETRY_DELAY", 60)),
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
