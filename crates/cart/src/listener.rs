//! Change notification for cart consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::snapshot::CartSnapshot;

/// Receives every new cart snapshot.
///
/// Listeners run synchronously on the task that performed the mutation,
/// after memory is updated and before the durable write starts. Keep them
/// short; hand heavy work off to another task.
pub trait CartListener: Send + Sync {
    fn on_change(&self, products: &CartSnapshot);
}

impl<F> CartListener for F
where
    F: Fn(&CartSnapshot) + Send + Sync,
{
    fn on_change(&self, products: &CartSnapshot) {
        self(products);
    }
}

/// Handle returned by `on_change`, used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn CartListener>)>>,
}

impl ListenerRegistry {
    pub(crate) fn register(&self, listener: Arc<dyn CartListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn notify(&self, snapshot: &CartSnapshot) {
        // Copy out so a listener may unregister itself.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.on_change(snapshot);
        }
    }
}
