//! Event Consumers - subscribers to the notification topics
//!
//! Consumers mirror what the poller publishes into their own state and
//! never publish on the poller's topics themselves.
//!
//! ```text
//!   NotificationPoller
//!          │ publish
//!          ▼
//!   ┌─────────────────────────────┐
//!   │ EventBus                    │
//!   │  notifications:unreadCount  │
//!   │  notifications:list         │
//!   └─────────────────────────────┘
//!          │ subscribe
//!          ▼
//!   NotificationBell (badge, dropdown list, click-through routes)
//! ```

mod notification_bell;

pub use notification_bell::{format_relative, route_for, NotificationBell};
