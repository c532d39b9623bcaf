//! Notification Bell - headless model of the navbar bell
//!
//! Tracks the unread badge from the poller's count topic and the dropdown
//! contents from the list topic (or an explicit refresh). Opening a
//! notification marks it read and yields the page it points at.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::{Notification, NotificationType};
use crate::event_bus::{BusError, EventBus, Subscription};
use crate::repository::{NotificationRepository, RepoResult};
use crate::service::DEFAULT_LIST_LIMIT;
use crate::topics::{NOTIFICATION_LIST, NOTIFICATION_UNREAD};

/// Largest count shown verbatim on the badge
const BADGE_MAX: u64 = 99;

#[derive(Debug, Default)]
struct BellState {
    unread_count: u64,
    notifications: Vec<Notification>,
}

/// Notification Bell consumer
pub struct NotificationBell {
    state: Arc<Mutex<BellState>>,
    repository: Arc<dyn NotificationRepository>,
    subscriptions: Vec<Subscription>,
}

impl NotificationBell {
    /// Subscribe to both notification topics
    pub fn attach(
        bus: &EventBus,
        repository: Arc<dyn NotificationRepository>,
    ) -> Result<Self, BusError> {
        let state = Arc::new(Mutex::new(BellState::default()));

        let count_state = state.clone();
        let unread = bus.subscribe(&NOTIFICATION_UNREAD, move |count: &u64| {
            trace!(unread = *count, "[NotificationBell] Unread count updated");
            count_state.lock().unread_count = *count;
        })?;

        let list_state = state.clone();
        let list = bus.subscribe(&NOTIFICATION_LIST, move |notifications: &Vec<Notification>| {
            trace!(
                count = notifications.len(),
                "[NotificationBell] Notification list updated"
            );
            list_state.lock().notifications = notifications.clone();
        });
        let list = match list {
            Ok(list) => list,
            Err(e) => {
                unread.dispose();
                return Err(e);
            }
        };

        debug!("[NotificationBell] Attached to event bus");
        Ok(Self {
            state,
            repository,
            subscriptions: vec![unread, list],
        })
    }

    pub fn unread_count(&self) -> u64 {
        self.state.lock().unread_count
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// Text for the badge; `None` hides it
    pub fn badge_label(&self) -> Option<String> {
        match self.unread_count() {
            0 => None,
            n if n > BADGE_MAX => Some(format!("{}+", BADGE_MAX)),
            n => Some(n.to_string()),
        }
    }

    /// Fetch the unread count directly so the badge is filled before the
    /// poller's first publish lands
    pub async fn refresh_count(&self) -> RepoResult<u64> {
        let count = self.repository.unread_count().await?.unread_count;
        self.state.lock().unread_count = count;
        debug!(unread = count, "[NotificationBell] Loaded unread count");
        Ok(count)
    }

    /// Fetch the latest notifications directly (dropdown opened or refresh
    /// clicked); the unread count is recomputed from the fetched page
    pub async fn refresh(&self) -> RepoResult<()> {
        let notifications = self.repository.list(DEFAULT_LIST_LIMIT).await?;
        let unread = notifications.iter().filter(|n| n.is_unread()).count() as u64;

        let mut state = self.state.lock();
        state.notifications = notifications;
        state.unread_count = unread;
        debug!(
            count = state.notifications.len(),
            unread,
            "[NotificationBell] Refreshed"
        );
        Ok(())
    }

    /// Handle a click on a notification
    ///
    /// Marks it read if needed, then returns the route it links to. A
    /// failed mark-read is logged and the route is still returned.
    pub async fn open_notification(&self, id: &str) -> Option<String> {
        let notification = {
            let state = self.state.lock();
            state.notifications.iter().find(|n| n.id == id).cloned()
        };
        let Some(notification) = notification else {
            debug!(id, "[NotificationBell] Notification not in current list");
            return None;
        };

        if notification.is_unread() {
            match self.repository.mark_read(id).await {
                Ok(()) => {
                    let mut state = self.state.lock();
                    if let Some(entry) = state.notifications.iter_mut().find(|n| n.id == id) {
                        entry.is_read = true;
                    }
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
                Err(e) => {
                    warn!(id, error = %e, "[NotificationBell] Failed to mark notification as read");
                }
            }
        }

        route_for(&notification)
    }

    /// Mark everything read on the server, then locally
    pub async fn mark_all_read(&self) -> RepoResult<()> {
        self.repository.mark_all_read().await?;

        let mut state = self.state.lock();
        for notification in state.notifications.iter_mut() {
            notification.is_read = true;
        }
        state.unread_count = 0;
        Ok(())
    }

    /// Stop listening to the bus
    pub fn detach(&self) {
        for subscription in &self.subscriptions {
            subscription.dispose();
        }
    }
}

impl Drop for NotificationBell {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Page a notification links to, if any
pub fn route_for(notification: &Notification) -> Option<String> {
    match notification.kind {
        NotificationType::Invite => Some(match &notification.project_id {
            Some(project_id) => format!("/invites?highlight={}", project_id),
            None => "/invites".to_string(),
        }),
        NotificationType::TaskAssigned | NotificationType::TaskCompleted => {
            let project_id = notification.project_id.as_ref()?;
            Some(match &notification.task_id {
                Some(task_id) => format!("/projects/{}?highlightTask={}", project_id, task_id),
                None => format!("/projects/{}", project_id),
            })
        }
        _ => None,
    }
}

/// Short relative age: "Just now", "5m ago", "3h ago", "2d ago"
pub fn format_relative(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_milliseconds().div_euclid(60_000);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / 1440)
    }
}
