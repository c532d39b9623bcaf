//! Event Bus - In-process typed pub/sub
//!
//! Decouples producers of named events (the notification poller) from any
//! number of consumers (bell badge, invite counters, logging).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  EventBus (channel registry)                 │
//! │                                                              │
//! │  "notifications:unreadCount" ─► [record 1, record 2, ...]    │
//! │  "notifications:list"        ─► [record 3, ...]              │
//! │                                                              │
//! │  Producers:                    Consumers:                    │
//! │  └─ NotificationPoller         ├─ NotificationBell           │
//! │                                └─ any Fn(&T) closure         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Delivery rules
//!
//! - `publish` snapshots the channel's records before invoking anything.
//!   Records added during delivery miss that event; records disposed during
//!   delivery still get it.
//! - Handlers run synchronously, in registration order, on the publishing
//!   thread. The registry lock is released first, so a handler may
//!   subscribe, dispose, clear or publish again.
//! - A once-record is claimed and dropped from the live set in the same
//!   critical section that takes the snapshot, so it can never fire twice,
//!   not even from a nested publish.
//! - A panicking handler is caught and logged. The remaining handlers still
//!   run and the publisher never sees the panic.
//! - A channel with no records is removed from the registry.
//!
//! # Usage
//!
//! ```ignore
//! let bus = EventBus::new();
//!
//! let sub = bus.subscribe(&NOTIFICATION_UNREAD, |count: &u64| {
//!     println!("unread: {count}");
//! })?;
//!
//! bus.publish(&NOTIFICATION_UNREAD, 3);
//! sub.dispose();
//! ```

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// A named channel carrying payloads of type `T`
///
/// The registry is keyed by name only. Two topics sharing a name but not a
/// payload type never see each other's events.
pub struct Topic<T> {
    name: Cow<'static, str>,
    _payload: PhantomData<fn(T)>,
}

impl<T> Topic<T> {
    /// Topic with a compile-time name
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _payload: PhantomData,
        }
    }

    /// Topic with a name built at runtime
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("payload", &type_name::<T>())
            .finish()
    }
}

/// Options for [`EventBus::subscribe_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Deliver at most one event, then drop the registration
    pub once: bool,
}

/// Errors returned when registering a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("channel name must not be empty")]
    EmptyChannel,
    #[error("event bus has been disposed")]
    Disposed,
}

type ErasedHandler = dyn Fn(&dyn Any) + Send + Sync;

/// One registration on a channel
///
/// Identity is the `id`, never the closure, so the same function can be
/// registered twice and removed independently.
struct HandlerRecord {
    id: u64,
    once: bool,
    fired: AtomicBool,
    payload_type: TypeId,
    payload_type_name: &'static str,
    handler: Box<ErasedHandler>,
}

impl HandlerRecord {
    /// Claim a once-record for delivery; false if it already fired
    fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Vec<Arc<HandlerRecord>>>,
    disposed: bool,
}

impl Registry {
    /// Detach one record; the caller drops it after releasing the lock
    fn remove_record(&mut self, channel: &str, id: u64) -> Option<Arc<HandlerRecord>> {
        let records = self.channels.get_mut(channel)?;
        let position = records.iter().position(|record| record.id == id)?;
        let removed = records.remove(position);
        if records.is_empty() {
            self.channels.remove(channel);
        }
        Some(removed)
    }
}

struct BusInner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

/// Event Bus - registry of named channels and their handlers
///
/// Cheap to clone; clones share one registry. Build one per application
/// (or per test) and hand clones to producers and consumers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `handler` for every event published on `topic`
    pub fn subscribe<T, F>(&self, topic: &Topic<T>, handler: F) -> Result<Subscription, BusError>
    where
        T: Any,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with(topic, SubscribeOptions::default(), handler)
    }

    /// Register `handler` for the next event published on `topic` only
    pub fn once<T, F>(&self, topic: &Topic<T>, handler: F) -> Result<Subscription, BusError>
    where
        T: Any,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with(topic, SubscribeOptions { once: true }, handler)
    }

    /// Register `handler` on `topic` with explicit options
    ///
    /// The channel entry is created on first registration. The returned
    /// [`Subscription`] removes exactly this registration when disposed.
    pub fn subscribe_with<T, F>(
        &self,
        topic: &Topic<T>,
        options: SubscribeOptions,
        handler: F,
    ) -> Result<Subscription, BusError>
    where
        T: Any,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let channel = topic.name();
        if channel.is_empty() {
            return Err(BusError::EmptyChannel);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(HandlerRecord {
            id,
            once: options.once,
            fired: AtomicBool::new(false),
            payload_type: TypeId::of::<T>(),
            payload_type_name: type_name::<T>(),
            handler: Box::new(move |payload: &dyn Any| {
                if let Some(payload) = payload.downcast_ref::<T>() {
                    handler(payload);
                }
            }),
        });

        let handlers = {
            let mut registry = self.inner.registry.lock();
            if registry.disposed {
                return Err(BusError::Disposed);
            }
            let records = registry.channels.entry(channel.to_string()).or_default();
            records.push(record);
            records.len()
        };

        debug!(
            channel,
            handler_id = id,
            once = options.once,
            handlers,
            "[EventBus] Subscribed"
        );

        Ok(Subscription {
            bus: Arc::downgrade(&self.inner),
            channel: channel.to_string(),
            id,
            disposed: AtomicBool::new(false),
        })
    }

    /// Deliver `payload` to every handler registered on `topic` right now
    ///
    /// Returns the number of handlers invoked (a handler that panicked
    /// counts as invoked). Publishing on an unknown channel is a no-op.
    pub fn publish<T: Any>(&self, topic: &Topic<T>, payload: T) -> usize {
        let channel = topic.name();

        let delivery: Vec<Arc<HandlerRecord>> = {
            let mut registry = self.inner.registry.lock();
            let Some(records) = registry.channels.get_mut(channel) else {
                trace!(channel, "[EventBus] No handlers for channel");
                return 0;
            };

            let payload_type = TypeId::of::<T>();
            let mut delivery = Vec::with_capacity(records.len());
            for record in records.iter() {
                if record.payload_type != payload_type {
                    warn!(
                        channel,
                        handler_id = record.id,
                        expected = record.payload_type_name,
                        published = type_name::<T>(),
                        "[EventBus] Skipping handler registered for another payload type"
                    );
                    continue;
                }
                if record.once && !record.claim() {
                    continue;
                }
                delivery.push(Arc::clone(record));
            }

            records.retain(|record| !(record.once && record.has_fired()));
            if records.is_empty() {
                registry.channels.remove(channel);
            }
            delivery
        };

        let payload: &dyn Any = &payload;
        for record in &delivery {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (record.handler)(payload)));
            if let Err(panic) = outcome {
                error!(
                    channel,
                    handler_id = record.id,
                    panic = %panic_message(panic.as_ref()),
                    "[EventBus] Handler panicked, continuing with remaining handlers"
                );
            }
        }

        trace!(
            channel,
            delivered = delivery.len(),
            "[EventBus] Published event"
        );
        delivery.len()
    }

    /// Remove every handler registered on `channel`
    pub fn clear_event(&self, channel: &str) {
        let removed = self.inner.registry.lock().channels.remove(channel);
        if let Some(records) = removed {
            debug!(
                channel,
                handlers = records.len(),
                "[EventBus] Cleared channel"
            );
        }
    }

    /// Remove every channel and handler
    pub fn clear_all(&self) {
        let removed = std::mem::take(&mut self.inner.registry.lock().channels);
        debug!(channels = removed.len(), "[EventBus] Cleared all channels");
        // Handlers may own values whose drop calls back into the bus
        drop(removed);
    }

    /// Tear the bus down: clear everything and refuse new registrations
    ///
    /// Publishing on a disposed bus is a silent no-op.
    pub fn dispose_all(&self) {
        let removed = {
            let mut registry = self.inner.registry.lock();
            registry.disposed = true;
            std::mem::take(&mut registry.channels)
        };
        debug!(channels = removed.len(), "[EventBus] Disposed");
        drop(removed);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.registry.lock().disposed
    }

    /// Number of channels holding at least one handler
    pub fn channel_count(&self) -> usize {
        self.inner.registry.lock().channels.len()
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.inner.registry.lock().channels.contains_key(channel)
    }

    /// Number of live registrations on `channel`
    pub fn handler_count(&self, channel: &str) -> usize {
        self.inner
            .registry
            .lock()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("EventBus")
            .field("channels", &registry.channels.len())
            .field("disposed", &registry.disposed)
            .finish()
    }
}

/// Disposer for one registration
///
/// Dropping a `Subscription` does not unregister the handler; call
/// [`Subscription::dispose`]. Disposing twice is a no-op.
pub struct Subscription {
    bus: Weak<BusInner>,
    channel: String,
    id: u64,
    disposed: AtomicBool,
}

impl Subscription {
    /// Remove this registration (and its channel, if it was the last one)
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let removed = inner.registry.lock().remove_record(&self.channel, self.id);
        debug!(
            channel = %self.channel,
            handler_id = self.id,
            removed = removed.is_some(),
            "[EventBus] Disposed subscription"
        );
        drop(removed);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether the registration is still live on the bus
    ///
    /// False after `dispose`, after a once-handler fired, or after the
    /// channel was cleared.
    pub fn is_registered(&self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let registry = inner.registry.lock();
        registry
            .channels
            .get(&self.channel)
            .is_some_and(|records| records.iter().any(|record| record.id == self.id))
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
