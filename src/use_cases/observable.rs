// Copy-on-write observable container backed by a watch channel.

use std::sync::Arc;
use tokio::sync::watch;

/// Holds the latest snapshot of a value and notifies subscribers on change.
///
/// Writers never mutate a published snapshot: every update clones the current
/// value, edits the clone and publishes it as a new `Arc`. Subscribers holding
/// an older `Arc` keep a complete, consistent view.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<Arc<T>>,
}

impl<T> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        self.tx.borrow().clone()
    }

    /// New receiver; `borrow()` on it yields the current value immediately.
    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    /// Replaces the whole value.
    pub fn set(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Observable<T> {
    /// Publishes an edited copy of the current value.
    pub fn update<R>(&self, edit: impl FnOnce(&mut T) -> R) -> R {
        let mut next = (**self.tx.borrow()).clone();
        let result = edit(&mut next);
        self.tx.send_replace(Arc::new(next));
        result
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
