//! Domain types shared by the bus, the poller and the API client
//!
//! - Notification records as served by the platform backend
//! - Unread-count payload
//! - Host visibility (the browser's document visibility, or a terminal's focus)

mod notification;
mod visibility;

pub use notification::{Notification, NotificationType, UnreadCount};
pub use visibility::Visibility;
