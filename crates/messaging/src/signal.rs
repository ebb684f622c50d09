use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use futures::Stream;
use tokio::sync::mpsc;

/// Observable cell holding the latest snapshot of `T`.
///
/// Every subscriber gets the current snapshot as its first item and then each later
/// snapshot exactly once, in the order the replacements were committed. Delivery is
/// buffered per subscriber, so a slow reader lags but never skips a snapshot.
pub struct Signal<T> {
    current: ArcSwap<T>,
    // Publishing and subscribing both hold this lock so a new subscriber can never
    // miss a snapshot or see one twice.
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Arc<T>>>>,
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Lock-free read of the latest committed snapshot.
    pub fn get(&self) -> Arc<T> {
        self.current.load_full()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscribers = self.lock_subscribers();
        sender.send(self.current.load_full()).ok();
        subscribers.push(sender);
        Subscription { receiver }
    }

    /// Swaps in a new snapshot and pushes it to every live subscriber.
    pub fn replace(&self, value: T) -> Arc<T> {
        let snapshot = Arc::new(value);
        let mut subscribers = self.lock_subscribers();
        self.current.store(Arc::clone(&snapshot));
        subscribers.retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    /// Read-modify-write of the current snapshot as one commit.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> Arc<T>
    where
        T: Clone,
    {
        let mut subscribers = self.lock_subscribers();
        let mut next = self.current.load_full().as_ref().clone();
        mutate(&mut next);
        let snapshot = Arc::new(next);
        self.current.store(Arc::clone(&snapshot));
        subscribers.retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|subscriber| !subscriber.is_closed());
        subscribers.len()
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<Arc<T>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Signal<T>
where
    T: Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Ordered stream of snapshots from a [`Signal`]. Dropping it unsubscribes.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<Arc<T>>,
}

impl<T> Subscription<T> {
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<T>> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Arc<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
