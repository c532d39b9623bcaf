//! # LabelPulse Core Library
//!
//! Notification plumbing for the annotation platform's web clients.
//!
//! ## Modules
//!
//! - `domain` - Notification records, unread counts, host visibility
//! - `event_bus` - In-process typed pub/sub with once-semantics
//! - `topics` - Fixed channels the poller publishes on
//! - `repository` - Read/write contract for the notification service
//! - `service` - Visibility-aware notification poller
//! - `consumers` - Subscribers that mirror bus state (notification bell)

pub mod consumers;
pub mod domain;
pub mod event_bus;
pub mod repository;
pub mod service;
pub mod topics;

// Re-export commonly used types
pub use domain::*;
pub use repository::*;
pub use service::*;

pub use consumers::{format_relative, route_for, NotificationBell};
pub use event_bus::{BusError, EventBus, SubscribeOptions, Subscription, Topic};
pub use topics::{NOTIFICATION_LIST, NOTIFICATION_UNREAD};
