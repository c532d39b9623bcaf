//! Tests for NotificationPoller scheduling and publishing

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use labelpulse_core::{
    EventBus, Notification, NotificationPoller, PollReport, PollerConfig, PollerConfigError,
    PollerState, VisibilityTracker, NOTIFICATION_LIST, NOTIFICATION_UNREAD,
};
use tests::fixtures::{read, task_assigned};
use tests::recorder::Recorder;
use tests::MockNotificationRepository;

fn make_poller(
    config: PollerConfig,
    repo: Arc<MockNotificationRepository>,
) -> (NotificationPoller, EventBus) {
    let bus = EventBus::new();
    let poller = NotificationPoller::new(config, bus.clone(), repo).unwrap();
    (poller, bus)
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn zero_interval_is_rejected() {
    let repo = Arc::new(MockNotificationRepository::new());
    let result = NotificationPoller::new(PollerConfig::with_interval_ms(0), EventBus::new(), repo);
    assert_eq!(result.err(), Some(PollerConfigError::ZeroInterval));
}

#[test]
fn zero_list_limit_is_rejected() {
    let repo = Arc::new(MockNotificationRepository::new());
    let config = PollerConfig {
        list_limit: 0,
        ..PollerConfig::default()
    };
    let result = NotificationPoller::new(config, EventBus::new(), repo);
    assert_eq!(result.err(), Some(PollerConfigError::ZeroListLimit));
}

// =============================================================================
// Single polls
// =============================================================================

#[tokio::test]
async fn poll_once_publishes_count() {
    let repo = Arc::new(MockNotificationRepository::new().with_counts([7]));
    let (poller, bus) = make_poller(PollerConfig::default(), repo.clone());
    let counts = Recorder::new();
    bus.subscribe(&NOTIFICATION_UNREAD, counts.handler()).unwrap();

    let report = poller.poll_once().await;

    assert_eq!(
        report,
        PollReport {
            unread_count: Some(7),
            listed: None,
            failures: 0,
        }
    );
    assert_eq!(counts.seen(), vec![7]);
    assert_eq!(repo.list_calls(), 0);
}

#[tokio::test]
async fn poll_once_fetches_list_with_configured_limit() {
    let repo = Arc::new(
        MockNotificationRepository::new()
            .with_counts([1])
            .with_notifications(vec![
                task_assigned("n1", "p1", "t1"),
                read(task_assigned("n2", "p1", "t2")),
            ]),
    );
    let config = PollerConfig {
        list_limit: 20,
        ..PollerConfig::default().fetch_list(true)
    };
    let (poller, bus) = make_poller(config, repo.clone());
    let lists: Recorder<Vec<Notification>> = Recorder::new();
    bus.subscribe(&NOTIFICATION_LIST, lists.handler()).unwrap();

    let report = poller.poll_once().await;

    assert_eq!(report.listed, Some(2));
    assert_eq!(repo.list_limits(), vec![20]);
    let published = lists.seen();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0][0].id, "n1");
    assert!(published[0][1].is_read);
}

#[tokio::test]
async fn count_failure_does_not_skip_list() {
    tests::logging::init();
    let repo = Arc::new(
        MockNotificationRepository::new().with_notifications(vec![task_assigned("n1", "p", "t")]),
    );
    repo.fail_count(true);
    let (poller, bus) = make_poller(PollerConfig::default().fetch_list(true), repo.clone());
    let counts: Recorder<u64> = Recorder::new();
    let lists: Recorder<Vec<Notification>> = Recorder::new();
    bus.subscribe(&NOTIFICATION_UNREAD, counts.handler()).unwrap();
    bus.subscribe(&NOTIFICATION_LIST, lists.handler()).unwrap();

    let report = poller.poll_once().await;

    assert_eq!(report.unread_count, None);
    assert_eq!(report.listed, Some(1));
    assert_eq!(report.failures, 1);
    assert_eq!(counts.count(), 0);
    assert_eq!(lists.count(), 1);
}

#[tokio::test]
async fn list_failure_still_publishes_count() {
    tests::logging::init();
    let repo = Arc::new(MockNotificationRepository::new().with_counts([3]));
    repo.fail_list(true);
    let (poller, bus) = make_poller(PollerConfig::default().fetch_list(true), repo.clone());
    let counts = Recorder::new();
    let lists: Recorder<Vec<Notification>> = Recorder::new();
    bus.subscribe(&NOTIFICATION_UNREAD, counts.handler()).unwrap();
    bus.subscribe(&NOTIFICATION_LIST, lists.handler()).unwrap();

    let report = poller.poll_once().await;

    assert_eq!(report.failures, 1);
    assert_eq!(counts.seen(), vec![3]);
    assert_eq!(lists.count(), 0);
}

// =============================================================================
// Mounted polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn mount_polls_immediately_then_every_interval() {
    let repo = Arc::new(MockNotificationRepository::new().with_counts([1, 2, 3, 4, 5]));
    let (poller, bus) = make_poller(PollerConfig::with_interval_ms(1000), repo.clone());
    let counts = Recorder::new();
    bus.subscribe(&NOTIFICATION_UNREAD, counts.handler()).unwrap();
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    assert_eq!(handle.state(), PollerState::ActiveVisible);

    sleep(Duration::from_millis(3500)).await;

    assert_eq!(repo.count_calls(), 4);
    assert_eq!(counts.seen(), vec![1, 2, 3, 4]);
    assert_eq!(repo.list_calls(), 0, "list is not fetched unless enabled");

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fetch_list_publishes_count_before_list() {
    let repo = Arc::new(
        MockNotificationRepository::new()
            .with_counts([1])
            .with_notifications(vec![task_assigned("n1", "p", "t")]),
    );
    let (poller, bus) = make_poller(
        PollerConfig::with_interval_ms(1000).fetch_list(true),
        repo.clone(),
    );
    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let order = order.clone();
        bus.subscribe(&NOTIFICATION_UNREAD, move |_: &u64| order.lock().push("count"))
            .unwrap();
    }
    {
        let order = order.clone();
        bus.subscribe(&NOTIFICATION_LIST, move |_: &Vec<Notification>| {
            order.lock().push("list")
        })
        .unwrap();
    }
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(repo.list_calls(), 2);
    assert_eq!(*order.lock(), vec!["count", "list", "count", "list"]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_polls_retry_on_next_tick() {
    tests::logging::init();
    let repo = Arc::new(MockNotificationRepository::new().with_counts([9]));
    repo.fail_count(true);
    let (poller, bus) = make_poller(PollerConfig::with_interval_ms(1000), repo.clone());
    let counts = Recorder::new();
    bus.subscribe(&NOTIFICATION_UNREAD, counts.handler()).unwrap();
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(repo.count_calls(), 2);
    assert_eq!(counts.count(), 0);

    repo.fail_count(false);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(repo.count_calls(), 3);
    assert_eq!(counts.seen(), vec![9]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_fetches_after_unmount() {
    let repo = Arc::new(MockNotificationRepository::new());
    let (poller, _bus) = make_poller(PollerConfig::with_interval_ms(1000), repo.clone());
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    let mut state = handle.watch_state();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(repo.count_calls(), 2);

    handle.unmount();
    handle.unmount();
    assert!(!handle.is_mounted());
    sleep(Duration::from_millis(5000)).await;

    assert_eq!(repo.count_calls(), 2);
    assert_eq!(*state.borrow_and_update(), PollerState::Idle);

    // Visibility changes after unmount are ignored too
    visibility.set(labelpulse_core::Visibility::Hidden);
    visibility.set(labelpulse_core::Visibility::Visible);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(repo.count_calls(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_unmounts() {
    let repo = Arc::new(MockNotificationRepository::new());
    let (poller, _bus) = make_poller(PollerConfig::with_interval_ms(1000), repo.clone());
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    sleep(Duration::from_millis(500)).await;
    drop(handle);
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(repo.count_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_idle() {
    let repo = Arc::new(MockNotificationRepository::new());
    let (poller, _bus) = make_poller(PollerConfig::with_interval_ms(1000), repo);
    let visibility = VisibilityTracker::default();

    let handle = poller.mount(visibility.subscribe());
    let state = handle.watch_state();
    sleep(Duration::from_millis(10)).await;

    handle.shutdown().await;
    assert_eq!(*state.borrow(), PollerState::Idle);
    assert!(!state.borrow().is_active());
}
