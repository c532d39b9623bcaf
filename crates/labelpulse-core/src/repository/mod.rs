//! Repository trait for the notification service
//!
//! Defines the interface the poller and consumers use to reach the
//! platform's notification endpoints without naming a transport
//! (HTTP client, in-memory mock, etc.)

use async_trait::async_trait;

use crate::domain::{Notification, UnreadCount};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Count unread notifications for the current user
    async fn unread_count(&self) -> RepoResult<UnreadCount>;

    /// Get up to `limit` notifications, newest first
    async fn list(&self, limit: u32) -> RepoResult<Vec<Notification>>;

    /// Mark one notification as read
    async fn mark_read(&self, id: &str) -> RepoResult<()>;

    /// Mark every unread notification as read
    async fn mark_all_read(&self) -> RepoResult<()>;
}
