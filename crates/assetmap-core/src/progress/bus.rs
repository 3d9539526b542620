//! In-process fan-out of progress events.
//!
//! The IPC client publishes every `export-progress` notification here. Views
//! subscribe with a filter and must dispose the returned [`Subscription`] on
//! teardown, so listeners never accumulate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, Weak};

use tracing::trace;

use super::types::ProgressEvent;

type Handler = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

struct Listener {
    id: u64,
    task_filter: Option<String>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// Process-wide progress event channel.
#[derive(Clone, Default)]
pub struct ProgressBus {
    inner: Arc<BusInner>,
}

static GLOBAL_BUS: LazyLock<ProgressBus> = LazyLock::new(ProgressBus::new);

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bus the default IPC client publishes to.
    pub fn global() -> &'static ProgressBus {
        &GLOBAL_BUS
    }

    fn register(&self, task_filter: Option<String>, handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .expect("bus lock poisoned")
            .push(Listener {
                id,
                task_filter,
                handler,
            });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Receive every event.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Receive only events for `task_id`.
    pub fn subscribe_task<F>(&self, task_id: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.register(Some(task_id.into()), Arc::new(handler))
    }

    /// Deliver an event to every matching listener. Returns how many received it.
    ///
    /// Handlers run on the caller's thread, outside the listener lock, so a
    /// handler may subscribe or dispose without deadlocking.
    pub fn publish(&self, event: &ProgressEvent) -> usize {
        let handlers: Vec<Handler> = {
            let listeners = self.inner.listeners.lock().expect("bus lock poisoned");
            listeners
                .iter()
                .filter(|l| l.task_filter.as_deref().map_or(true, |t| t == event.task_id))
                .map(|l| Arc::clone(&l.handler))
                .collect()
        };
        trace!(
            "Publishing progress for {} to {} listener(s)",
            event.task_id,
            handlers.len()
        );
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().expect("bus lock poisoned").len()
    }
}

impl std::fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle for one listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Unsubscribe explicitly.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.listeners
                .lock()
                .expect("bus lock poisoned")
                .retain(|l| l.id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::types::ProgressStatus;
    use std::sync::atomic::AtomicUsize;

    fn event(task: &str) -> ProgressEvent {
        ProgressEvent::new(task, 50.0, ProgressStatus::Running, "half")
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = ProgressBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let a = {
            let hits = Arc::clone(&hits);
            bus.subscribe(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let b = {
            let hits = Arc::clone(&hits);
            bus.subscribe(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(bus.publish(&event("export_1")), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        a.dispose();
        b.dispose();
    }

    #[test]
    fn test_task_filter() {
        let bus = ProgressBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = {
            let hits = Arc::clone(&hits);
            bus.subscribe_task("export_2", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(bus.publish(&event("export_1")), 0);
        assert_eq!(bus.publish(&event("export_2")), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        drop(sub);
    }

    #[test]
    fn test_dispose_and_drop_unsubscribe() {
        let bus = ProgressBus::new();
        let first = bus.subscribe(|_| {});
        let second = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 2);

        first.dispose();
        assert_eq!(bus.subscriber_count(), 1);

        drop(second);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(&event("export_1")), 0);
    }

    #[test]
    fn test_subscription_outliving_bus_is_harmless() {
        let bus = ProgressBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
