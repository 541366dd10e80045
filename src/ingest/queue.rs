use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

/// Shared state behind a [`DropOldestSender`]/[`DropOldestReceiver`] pair.
struct Ring<T> {
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    closed: AtomicBool,
    senders: AtomicUsize,
}

/// The producer half of a bounded channel that sheds the oldest queued
/// item rather than blocking when the buffer is full. Ingestion favors
/// the freshest book snapshot over a stale one a consumer hasn't gotten
/// to yet, so a slow consumer never stalls a venue's stream.
pub struct DropOldestSender<T> {
    ring: Arc<Ring<T>>,
}

/// The consumer half of a [`drop_oldest_channel`].
pub struct DropOldestReceiver<T> {
    ring: Arc<Ring<T>>,
}

/// Creates a drop-oldest bounded channel with room for `capacity` items.
pub fn drop_oldest_channel<T>(capacity: usize) -> (DropOldestSender<T>, DropOldestReceiver<T>) {
    let ring = Arc::new(Ring {
        capacity: capacity.max(1),
        queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
        senders: AtomicUsize::new(1),
    });
    (DropOldestSender { ring: ring.clone() }, DropOldestReceiver { ring })
}

impl<T> Clone for DropOldestSender<T> {
    fn clone(&self) -> Self {
        self.ring.senders.fetch_add(1, Ordering::SeqCst);
        Self { ring: self.ring.clone() }
    }
}

impl<T> Drop for DropOldestSender<T> {
    fn drop(&mut self) {
        if self.ring.senders.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.ring.closed.store(true, Ordering::SeqCst);
            self.ring.notify.notify_waiters();
        }
    }
}

impl<T> DropOldestSender<T> {
    /// Pushes `value`, dropping the oldest queued item first if the
    /// buffer is already at capacity. Returns `true` if an item was
    /// dropped to make room.
    pub fn push(&self, value: T) -> bool {
        let dropped = {
            let mut queue = self.ring.queue.lock();
            let dropped = if queue.len() >= self.ring.capacity {
                queue.pop_front();
                true
            } else {
                false
            };
            queue.push_back(value);
            dropped
        };
        self.ring.notify.notify_one();
        dropped
    }
}

impl<T> DropOldestReceiver<T> {
    /// Waits for the next item, returning `None` once every sender has
    /// been dropped and the buffer has drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            {
                let mut queue = self.ring.queue.lock();
                if let Some(value) = queue.pop_front() {
                    return Some(value);
                }
                if self.ring.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            self.ring.notify.notified().await;
        }
    }
}

/// Pushes onto `sender`, logging a `venue` tagged warning whenever the
/// buffer is full and the oldest event is dropped to make room.
pub fn push_with_drop_warning<T>(sender: &DropOldestSender<T>, venue: &'static str, value: T) {
    if sender.push(value) {
        warn!(venue, "ingest_event_dropped_oldest");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drops_oldest_when_over_capacity() {
        let (tx, mut rx) = drop_oldest_channel(2);
        tx.push(1);
        tx.push(2);
        let dropped = tx.push(3);
        assert!(dropped);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn recv_returns_none_after_all_senders_drop() {
        let (tx, mut rx) = drop_oldest_channel::<i32>(4);
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn clone_keeps_channel_open_until_all_senders_drop() {
        let (tx, mut rx) = drop_oldest_channel(4);
        let tx2 = tx.clone();
        drop(tx);
        tx2.push(7);
        assert_eq!(rx.recv().await, Some(7));
        drop(tx2);
        assert_eq!(rx.recv().await, None);
    }
}
