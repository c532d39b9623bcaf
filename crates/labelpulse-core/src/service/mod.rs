//! Domain services
//!
//! Background work that keeps the event bus in sync with the notification
//! service.

mod notification_poller;
mod poller_config;
mod visibility_tracker;

pub use notification_poller::{NotificationPoller, PollReport, PollerHandle, PollerState};
pub use poller_config::{
    PollerConfig, PollerConfigError, DEFAULT_LIST_LIMIT, DEFAULT_POLL_INTERVAL,
};
pub use visibility_tracker::{VisibilitySignal, VisibilityTracker};
