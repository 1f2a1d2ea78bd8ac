use std::sync::{Arc, Mutex, PoisonError};

use route_trace_lib::stop::Stop;

/// The map view as seen from the session. It is owned elsewhere, the session only tells it
/// when to drop its overlays and which stops the route line should pass through.
///
/// Calls arrive while the session is locked, so implementations must not send
/// commands back to the runtime from inside them.
pub trait MapCollaborator: Send + Sync {
    fn reset(&self);

    fn draw_route(&self, _stops: &[Stop]) {}
}

impl<F> MapCollaborator for F
where
    F: Fn() + Send + Sync,
{
    fn reset(&self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans session resets (and route drawing) out to every registered map.
#[derive(Default)]
pub struct SessionResetNotifier {
    listeners: Mutex<Listeners>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn MapCollaborator>)>,
}

impl SessionResetNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn MapCollaborator>) -> ListenerId {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        id
    }

    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `reset` once on every listener.
    pub fn notify_reset(&self) {
        for listener in self.snapshot() {
            listener.reset();
        }
    }

    pub fn draw_route(&self, stops: &[Stop]) {
        for listener in self.snapshot() {
            listener.draw_route(stops);
        }
    }

    // Listeners are called without the lock held, so they may register or unregister.
    fn snapshot(&self) -> Vec<Arc<dyn MapCollaborator>> {
        self.listeners.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn each_listener_called_once_per_reset() {
        let notifier = SessionResetNotifier::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        notifier.register(Arc::new(move || { counter.fetch_add(1, Ordering::SeqCst); }));
        let counter = second.clone();
        let id = notifier.register(Arc::new(move || { counter.fetch_add(1, Ordering::SeqCst); }));

        notifier.notify_reset();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        assert!(notifier.unregister(id));
        assert!(!notifier.unregister(id));
        notifier.notify_reset();
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn closures_ignore_draw_route() {
        let notifier = SessionResetNotifier::new();
        notifier.register(Arc::new(|| {}));
        notifier.draw_route(&[]);
        assert!(!notifier.is_empty());
    }
}
