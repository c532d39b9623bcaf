use std::time::Duration;

use thiserror::Error;

/// Default tick period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of notifications fetched per list refresh
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Notification poller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Also fetch and publish the notification list on every poll
    pub fetch_list_on_interval: bool,
    /// Maximum notifications fetched per list refresh
    pub list_limit: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            fetch_list_on_interval: false,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl PollerConfig {
    /// Default configuration with a tick period in milliseconds
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            ..Self::default()
        }
    }

    pub fn fetch_list(mut self, enabled: bool) -> Self {
        self.fetch_list_on_interval = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), PollerConfigError> {
        if self.interval.is_zero() {
            return Err(PollerConfigError::ZeroInterval);
        }
        if self.list_limit == 0 {
            return Err(PollerConfigError::ZeroListLimit);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("notification list limit must be greater than zero")]
    ZeroListLimit,
}
