use tokio::sync::watch;
use tracing::debug;

use crate::domain::Visibility;

/// Value carried on the visibility channel
///
/// `reveals` counts Hidden→Visible transitions. A watch channel keeps only
/// the latest value, so a hide/show pair that lands between two reads looks
/// like "still visible"; the counter still moves and the reveal is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilitySignal {
    pub visibility: Visibility,
    pub reveals: u64,
}

/// Source of host visibility changes
///
/// Plays the role of the browser's `visibilitychange` event. The host flips
/// it; pollers watch it. Setting the current value again notifies nobody.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    tx: watch::Sender<VisibilitySignal>,
}

impl VisibilityTracker {
    pub fn new(initial: Visibility) -> Self {
        let (tx, _) = watch::channel(VisibilitySignal {
            visibility: initial,
            reveals: 0,
        });
        Self { tx }
    }

    /// Record a new visibility; returns true if it changed
    pub fn set(&self, visibility: Visibility) -> bool {
        let changed = self.tx.send_if_modified(|signal| {
            if signal.visibility == visibility {
                return false;
            }
            if visibility.is_visible() {
                signal.reveals += 1;
            }
            signal.visibility = visibility;
            true
        });
        if changed {
            debug!(visibility = ?visibility, "[Visibility] Host visibility changed");
        }
        changed
    }

    pub fn current(&self) -> Visibility {
        self.tx.borrow().visibility
    }

    /// Number of Hidden→Visible transitions so far
    pub fn reveals(&self) -> u64 {
        self.tx.borrow().reveals
    }

    pub fn subscribe(&self) -> watch::Receiver<VisibilitySignal> {
        self.tx.subscribe()
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}
