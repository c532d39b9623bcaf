//! labelpulse-watch
//!
//! Mounts the notification poller against a live API and logs what the
//! bus delivers. Typing `hide` / `show` on stdin flips host visibility the
//! way switching browser tabs would.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use labelpulse_client::{ApiConfig, NotificationApiClient};
use labelpulse_core::{
    format_relative, EventBus, Notification, NotificationBell, NotificationPoller, PollerConfig,
    Visibility, VisibilityTracker, NOTIFICATION_LIST, NOTIFICATION_UNREAD,
};

/// Initialize console tracing
///
/// RUST_LOG takes precedence; otherwise `info` with debug output for our
/// own crates.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("labelpulse_core=debug".parse().unwrap())
            .add_directive("labelpulse_client=debug".parse().unwrap())
            .add_directive("labelpulse_watch=debug".parse().unwrap())
    });

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// Poller settings from `LABELPULSE_INTERVAL_MS` and `LABELPULSE_FETCH_LIST`
fn poller_config_from_env() -> PollerConfig {
    let mut config = PollerConfig::default();

    if let Ok(raw) = env::var("LABELPULSE_INTERVAL_MS") {
        match raw.trim().parse::<u64>() {
            Ok(ms) => config.interval = Duration::from_millis(ms),
            Err(_) => warn!(value = %raw, "Ignoring invalid LABELPULSE_INTERVAL_MS"),
        }
    }

    if let Ok(raw) = env::var("LABELPULSE_FETCH_LIST") {
        config.fetch_list_on_interval = matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }

    config
}

fn print_help() {
    println!("commands: show | hide | list | open <id> | read-all | status | help | quit");
}

fn print_notification(notification: &Notification) {
    println!(
        "{} {:<20} {:<32} {} ({})",
        if notification.is_unread() { "*" } else { " " },
        notification.kind.as_str(),
        notification.title,
        format_relative(notification.created_at, Utc::now()),
        notification.id,
    );
}

/// Run one stdin command; false means quit
async fn handle_command(line: &str, bell: &NotificationBell, visibility: &VisibilityTracker) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some("show"), _) => {
            visibility.set(Visibility::Visible);
        }
        (Some("hide"), _) => {
            visibility.set(Visibility::Hidden);
        }
        (Some("list"), _) => match bell.refresh().await {
            Ok(()) => {
                let notifications = bell.notifications();
                if notifications.is_empty() {
                    println!("No notifications");
                }
                for notification in &notifications {
                    print_notification(notification);
                }
            }
            Err(e) => warn!(error = %e, "Failed to fetch notifications"),
        },
        (Some("open"), Some(id)) => match bell.open_notification(id).await {
            Some(route) => println!("-> {}", route),
            None => println!("nothing to open for {}", id),
        },
        (Some("read-all"), _) => {
            if let Err(e) = bell.mark_all_read().await {
                warn!(error = %e, "Failed to mark all notifications read");
            }
        }
        (Some("status"), _) => {
            println!(
                "visibility: {:?}, badge: {}",
                visibility.current(),
                bell.badge_label().unwrap_or_else(|| "-".to_string())
            );
        }
        (Some("quit" | "exit"), _) => return false,
        _ => print_help(),
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let api_config = ApiConfig::from_env();
    info!(base_url = %api_config.base_url, "Starting labelpulse-watch");

    let client = Arc::new(
        NotificationApiClient::new(api_config).context("Failed to build HTTP client")?,
    );

    let bus = EventBus::new();
    let bell = NotificationBell::attach(&bus, client.clone())?;
    if let Err(e) = bell.refresh_count().await {
        warn!(error = %e, "Failed to load unread count");
    }

    let unread_log = bus.subscribe(&NOTIFICATION_UNREAD, |count: &u64| {
        info!(unread = *count, "Unread notifications");
    })?;
    let list_log = bus.subscribe(&NOTIFICATION_LIST, |notifications: &Vec<Notification>| {
        let unread = notifications.iter().filter(|n| n.is_unread()).count();
        info!(total = notifications.len(), unread, "Notification list");
    })?;

    let visibility = VisibilityTracker::default();
    let poller = NotificationPoller::new(poller_config_from_env(), bus.clone(), client)
        .context("Invalid poller configuration")?;
    let handle = poller.mount(visibility.subscribe());

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_command(line.trim(), &bell, &visibility).await {
                        break;
                    }
                }
                Ok(None) => {
                    // No terminal attached; keep polling until Ctrl-C
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown().await;
    unread_log.dispose();
    list_log.dispose();
    bell.detach();
    bus.dispose_all();
    Ok(())
}
