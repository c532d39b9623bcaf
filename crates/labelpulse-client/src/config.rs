use std::env;
use std::time::Duration;

/// API root used when `LABELPULSE_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification API client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// API root, e.g. `https://labels.example.com/api/v1`
    pub base_url: String,
    /// Bearer token for the signed-in user
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read `LABELPULSE_API_URL`, `LABELPULSE_API_TOKEN` and
    /// `LABELPULSE_API_TIMEOUT_SECS`, falling back to defaults
    ///
    /// Does not load `.env`; the binary does that before calling this.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("LABELPULSE_API_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }

        config.token = env::var("LABELPULSE_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        if let Ok(raw) = env::var("LABELPULSE_API_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %raw,
                    "[NotificationApi] Ignoring invalid LABELPULSE_API_TIMEOUT_SECS"
                ),
            }
        }

        config
    }

    /// Absolute URL for an API path such as `/notifications`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
