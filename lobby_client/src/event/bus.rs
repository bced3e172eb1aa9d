use super::*;
use crate::id::SubscriptionId;

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A subscriber callback.
///
/// Handlers run on the connection task and must not block. An `Err` return
/// or a panic is logged and does not prevent later subscribers from running.
pub type Handler = Arc<dyn Fn(&Notification<'_>) -> anyhow::Result<()> + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives every event
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// Publish/subscribe registry for one connection's events.
///
/// Cloning an `EventBus` yields another reference to the same set of
/// subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
    failures: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of the given kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(Some(kind), Arc::new(handler))
    }

    /// Register `handler` for every event
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(None, Arc::new(handler))
    }

    fn add(&self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push(Subscriber { id, kind, handler });
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Number of current subscriptions
    pub fn len(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of handler invocations that returned an error or panicked
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Invoke every current subscriber for this notification's event kind, in
    /// subscription order.
    ///
    /// The subscriber list is copied before dispatch begins, so handlers may
    /// subscribe or unsubscribe freely. Changes take effect from the next
    /// publish.
    pub fn publish(&self, notification: &Notification<'_>) {
        let kind = notification.kind();

        let handlers: Vec<(SubscriptionId, Handler)> = self
            .inner
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| (s.id, Arc::clone(&s.handler)))
            .collect();

        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(notification))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        event = kind.name(),
                        subscription = id.0,
                        "Error in event handler: {:?}",
                        e
                    );
                }
                Err(panic) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    tracing::error!(
                        event = kind.name(),
                        subscription = id.0,
                        "Event handler panicked: {}",
                        detail
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .field("failures", &self.failures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConnectionContext, ContextSettings, SessionIdentity};
    use crate::id::NetworkId;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn context() -> ConnectionContext {
        ConnectionContext::new(
            NetworkId::next(),
            1,
            SessionIdentity::default(),
            ContextSettings::default(),
            Instant::now(),
        )
    }

    fn publish(bus: &EventBus, ctx: &ConnectionContext, event: Event) {
        bus.publish(&Notification {
            context: ctx,
            event: &event,
            message: None,
        });
    }

    fn sync(channel: &str) -> Event {
        Event::SyncComplete {
            channel: channel.to_string(),
        }
    }

    #[test]
    fn subscribers_run_in_order() {
        let bus = EventBus::new();
        let ctx = context();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let seen = Arc::clone(&seen);
            bus.subscribe(EventKind::SyncComplete, move |_| {
                seen.lock().push(n);
                Ok(())
            });
        }
        // Different kind; must not be invoked
        let other = Arc::clone(&seen);
        bus.subscribe(EventKind::AuthComplete, move |_| {
            other.lock().push(99);
            Ok(())
        });

        publish(&bus, &ctx, sync("main"));
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let ctx = context();
        let count = Arc::new(AtomicU64::new(0));

        let c = Arc::clone(&count);
        let id = bus.subscribe_all(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        publish(&bus, &ctx, sync("a"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        publish(&bus, &ctx, sync("b"));

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn failing_handlers_are_isolated() {
        let bus = EventBus::new();
        let ctx = context();
        let reached = Arc::new(AtomicU64::new(0));

        bus.subscribe(EventKind::SyncComplete, |_| anyhow::bail!("broken"));
        bus.subscribe(EventKind::SyncComplete, |_| panic!("also broken"));
        let r = Arc::clone(&reached);
        bus.subscribe(EventKind::SyncComplete, move |_| {
            r.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        publish(&bus, &ctx, sync("main"));

        assert_eq!(reached.load(Ordering::Relaxed), 1);
        assert_eq!(bus.failures(), 2);
    }

    #[test]
    fn subscribing_during_dispatch_uses_snapshot() {
        let bus = EventBus::new();
        let ctx = context();
        let late_calls = Arc::new(AtomicU64::new(0));

        let inner_bus = bus.clone();
        let late = Arc::clone(&late_calls);
        let first = bus.subscribe(EventKind::SyncComplete, move |_| {
            let late = Arc::clone(&late);
            inner_bus.subscribe(EventKind::SyncComplete, move |_| {
                late.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
            Ok(())
        });

        publish(&bus, &ctx, sync("main"));
        assert_eq!(late_calls.load(Ordering::Relaxed), 0);
        assert_eq!(bus.len(), 2);

        bus.unsubscribe(first);
        publish(&bus, &ctx, sync("main"));
        assert_eq!(late_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn handler_can_read_context() {
        let bus = EventBus::new();
        let ctx = context();
        let network = ctx.network();
        let seen = Arc::new(Mutex::new(None));

        let s = Arc::clone(&seen);
        bus.subscribe(EventKind::SyncComplete, move |n| {
            *s.lock() = Some(n.context.network());
            Ok(())
        });
        publish(&bus, &ctx, sync("main"));

        assert_eq!(*seen.lock(), Some(network));
    }
}
