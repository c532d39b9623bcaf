//! Notification Poller - keeps the bus in sync with the notification service
//!
//! One background task per mounted poller. It fetches the unread count (and
//! optionally the latest notifications) and republishes the results on the
//! fixed topics, so consumers never run their own timers.
//!
//! # State machine
//!
//! ```text
//!            mount (immediate poll)
//!   Idle ───────────────────────────► ActiveVisible ◄──┐
//!    ▲                                   │   ▲         │ tick → poll
//!    │ unmount                   hidden  │   │ visible └──────────
//!    │                                   ▼   │ (immediate poll)
//!    └───────────────────────────── ActiveHidden
//!                                     tick → suppressed
//! ```
//!
//! The timer keeps running while hidden; ticks that land in that window are
//! dropped rather than queued. Fetch failures are logged and the next tick
//! retries with no backoff.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::poller_config::{PollerConfig, PollerConfigError};
use super::visibility_tracker::VisibilitySignal;
use crate::domain::Visibility;
use crate::event_bus::EventBus;
use crate::repository::NotificationRepository;
use crate::topics::{NOTIFICATION_LIST, NOTIFICATION_UNREAD};

/// Lifecycle state of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    /// Not mounted, or unmounted
    Idle,
    /// Timer running and ticks polling
    ActiveVisible,
    /// Timer running but ticks suppressed
    ActiveHidden,
}

impl PollerState {
    fn for_visibility(visibility: Visibility) -> Self {
        if visibility.is_visible() {
            Self::ActiveVisible
        } else {
            Self::ActiveHidden
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Outcome of a single poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Unread count published, if the fetch succeeded
    pub unread_count: Option<u64>,
    /// Number of notifications published, if the list was fetched
    pub listed: Option<usize>,
    /// Fetches that failed during this poll
    pub failures: usize,
}

/// Notification Poller - sole producer on the notification topics
pub struct NotificationPoller {
    config: PollerConfig,
    bus: EventBus,
    repository: Arc<dyn NotificationRepository>,
}

impl NotificationPoller {
    /// Create a poller; rejects configurations that could never tick
    pub fn new(
        config: PollerConfig,
        bus: EventBus,
        repository: Arc<dyn NotificationRepository>,
    ) -> Result<Self, PollerConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            bus,
            repository,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Fetch once and publish whatever succeeded
    ///
    /// The count and the list are fetched independently: a failed count
    /// fetch does not skip the list.
    pub async fn poll_once(&self) -> PollReport {
        let mut report = PollReport::default();

        match self.repository.unread_count().await {
            Ok(count) => {
                self.bus.publish(&NOTIFICATION_UNREAD, count.unread_count);
                report.unread_count = Some(count.unread_count);
            }
            Err(e) => {
                warn!(error = %e, "[NotificationPoller] Failed to fetch unread count");
                report.failures += 1;
            }
        }

        if self.config.fetch_list_on_interval {
            match self.repository.list(self.config.list_limit).await {
                Ok(notifications) => {
                    let listed = notifications.len();
                    self.bus.publish(&NOTIFICATION_LIST, notifications);
                    report.listed = Some(listed);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        limit = self.config.list_limit,
                        "[NotificationPoller] Failed to fetch notifications"
                    );
                    report.failures += 1;
                }
            }
        }

        trace!(
            unread = ?report.unread_count,
            listed = ?report.listed,
            failures = report.failures,
            "[NotificationPoller] Poll finished"
        );
        report
    }

    /// Start polling in a background task
    ///
    /// Polls immediately, then every `interval` while `visibility` reports
    /// the host as visible, and immediately again after every reveal
    /// (Hidden→Visible), including reveals that happened while a fetch was
    /// in flight. Must be called from within a tokio runtime.
    pub fn mount(self, visibility: watch::Receiver<VisibilitySignal>) -> PollerHandle {
        let initial = *visibility.borrow();
        let (state_tx, state_rx) =
            watch::channel(PollerState::for_visibility(initial.visibility));
        let cancel = CancellationToken::new();

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            fetch_list = self.config.fetch_list_on_interval,
            visibility = ?initial.visibility,
            "[NotificationPoller] Mounted"
        );

        let task = tokio::spawn(self.run(initial, visibility, state_tx, cancel.clone()));

        PollerHandle {
            cancel,
            task: Some(task),
            state: state_rx,
        }
    }

    async fn run(
        self,
        initial: VisibilitySignal,
        mut visibility: watch::Receiver<VisibilitySignal>,
        state_tx: watch::Sender<PollerState>,
        cancel: CancellationToken,
    ) {
        let period = self.config.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut current = initial.visibility;
        let mut seen_reveals = initial.reveals;
        let mut watching = true;

        let mut running = self.poll_unless_cancelled(&cancel).await;
        while running {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    running = false;
                }

                changed = visibility.changed(), if watching => {
                    if changed.is_err() {
                        debug!("[NotificationPoller] Visibility source closed, keeping last state");
                        watching = false;
                        continue;
                    }
                    let next = *visibility.borrow_and_update();
                    if next.visibility != current {
                        current = next.visibility;
                        state_tx.send_replace(PollerState::for_visibility(current));
                        debug!(visibility = ?current, "[NotificationPoller] Visibility changed");
                    }

                    if next.reveals != seen_reveals {
                        seen_reveals = next.reveals;
                        running = self.poll_unless_cancelled(&cancel).await;
                    }
                }

                _ = ticker.tick() => {
                    if current.is_visible() {
                        running = self.poll_unless_cancelled(&cancel).await;
                    } else {
                        trace!("[NotificationPoller] Tick suppressed while hidden");
                    }
                }
            }
        }

        state_tx.send_replace(PollerState::Idle);
        info!("[NotificationPoller] Unmounted");
    }

    /// Poll, abandoning the in-flight fetch on unmount; false if cancelled
    async fn poll_unless_cancelled(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.poll_once() => true,
        }
    }
}

/// Handle to a mounted poller
///
/// Unmounting (explicitly or by dropping the handle) stops the timer and
/// detaches from the visibility source.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    state: watch::Receiver<PollerState>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop polling; safe to call more than once
    pub fn unmount(&self) {
        if !self.cancel.is_cancelled() {
            debug!("[NotificationPoller] Unmount requested");
            self.cancel.cancel();
        }
    }

    /// Unmount and wait for the background task to finish
    pub async fn shutdown(mut self) {
        self.unmount();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "[NotificationPoller] Poll task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
