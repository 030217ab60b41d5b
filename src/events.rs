use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use vitrine_shared::{ListenerId, ViewModelKind, WindowId};

/// Lifecycle notifications raised by the window manager.
#[derive(Debug, Clone)]
pub enum WindowEvent {
    Opened {
        window: WindowId,
        kind: ViewModelKind,
    },
    Closed {
        window: WindowId,
    },
    /// Raised by the try-variant API surface when an operation fails.
    Error {
        operation: &'static str,
        message: String,
    },
}

type Listener = Arc<dyn Fn(&WindowEvent) + Send + Sync>;

/// Listener registry for window events. A panicking listener is isolated
/// and logged; it never breaks lifecycle processing.
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&WindowEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    pub fn emit(&self, event: &WindowEvent) {
        let listeners: Vec<Listener> = {
            let guard = self.listeners.lock();
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log::error!("window event listener panicked on {event:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emits_to_subscribers_until_unsubscribed() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = hub.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let event = WindowEvent::Closed {
            window: WindowId::new(),
        };
        hub.emit(&event);
        hub.unsubscribe(id);
        hub.emit(&event);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_poison_dispatch() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        hub.subscribe(|_| panic!("listener bug"));
        let seen = Arc::clone(&count);
        hub.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(&WindowEvent::Closed {
            window: WindowId::new(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
