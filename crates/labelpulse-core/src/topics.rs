//! Channels owned by the notification poller
//!
//! The poller is the only producer on these topics. Consumers subscribe
//! and never publish on them.

use crate::domain::Notification;
use crate::event_bus::Topic;

/// Latest unread-notification count for the signed-in user
pub const NOTIFICATION_UNREAD: Topic<u64> = Topic::new("notifications:unreadCount");

/// Most recent notifications, newest first
pub const NOTIFICATION_LIST: Topic<Vec<Notification>> = Topic::new("notifications:list");
