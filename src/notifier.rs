// Notifier - fan-out of serialized changes to subscribed clients
//
// Subscribers are registered from connection handlers running on arbitrary
// tasks, while broadcasts come from the controller, so the registry lives
// behind a mutex. Every subscriber owns a bounded channel. Delivery never
// waits: a subscriber whose buffer is full (or whose receiver is gone) is
// dropped from the registry, which closes its channel. A client that
// reconnects gets a full snapshot on registration, so nothing is lost for
// good.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outbound payload channel for one subscriber
pub type SubscriberTx = mpsc::Sender<Bytes>;

/// Publish/subscribe registry
#[derive(Debug, Default)]
pub struct Notifier {
    clients: Mutex<HashMap<u64, SubscriberTx>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel and return its id (ids start at 1 and only grow)
    pub fn subscribe(&self, tx: SubscriberTx) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock_clients().insert(id, tx);

        tracing::info!("Registered new client {}", id);
        id
    }

    /// Remove a subscriber and close its channel; unknown ids are ignored
    pub fn unsubscribe(&self, id: u64) {
        // The sender is dropped outside the lock, which closes the channel
        let removed = self.lock_clients().remove(&id);
        if removed.is_some() {
            tracing::info!("Deregistered client {}", id);
        }
    }

    /// Send the same payload to every subscriber
    pub fn notify_all(&self, data: Bytes) {
        let mut clients = self.lock_clients();
        let stale: Vec<u64> = clients
            .iter()
            .filter(|(id, tx)| !Self::deliver(**id, tx, data.clone()))
            .map(|(id, _)| *id)
            .collect();

        for id in stale {
            clients.remove(&id);
            tracing::info!("Deregistered client {}", id);
        }
    }

    /// Send a payload to one subscriber, if it is still registered
    pub fn notify_one(&self, id: u64, data: Bytes) {
        let mut clients = self.lock_clients();
        let Some(tx) = clients.get(&id) else {
            tracing::warn!("Subscriber id {} was not found", id);
            return;
        };

        if !Self::deliver(id, tx, data) {
            clients.remove(&id);
            tracing::info!("Deregistered client {}", id);
        }
    }

    /// Unsubscribe everyone
    pub fn close(&self) {
        let drained: Vec<u64> = self.lock_clients().drain().map(|(id, _)| id).collect();
        if !drained.is_empty() {
            tracing::info!("Closed {} subscriber(s)", drained.len());
        }
    }

    pub fn len(&self) -> usize {
        self.lock_clients().len()
    }

    /// Returns false when the subscriber should be dropped
    fn deliver(id: u64, tx: &SubscriberTx, data: Bytes) -> bool {
        match tx.try_send(data) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Client {} is not keeping up; dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Client {} channel already closed", id);
                false
            }
        }
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<u64, SubscriberTx>> {
        // A panic while holding the lock cannot leave the map half-updated,
        // so a poisoned lock is still usable
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_subscribe() {
        let notifier = Arc::new(Notifier::new());
        let mut handles = Vec::new();
        let mut receivers = Vec::new();

        for _ in 0..10 {
            let (tx, rx) = mpsc::channel(1);
            receivers.push(rx);
            let notifier = notifier.clone();
            handles.push(tokio::spawn(async move { notifier.subscribe(tx) }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 10);
        assert_eq!(notifier.len(), 10);
    }

    #[test]
    fn test_ids_increase() {
        let notifier = Notifier::new();
        let (tx, _rx) = mpsc::channel(1);
        let first = notifier.subscribe(tx.clone());
        let second = notifier.subscribe(tx);
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_channel() {
        let notifier = Notifier::new();
        let (tx, mut rx) = mpsc::channel(1);
        let id = notifier.subscribe(tx);

        notifier.unsubscribe(id);
        assert_eq!(notifier.len(), 0);
        assert!(rx.recv().await.is_none());

        // Unknown ids are a no-op
        notifier.unsubscribe(id);
        notifier.unsubscribe(12345);
    }

    #[tokio::test]
    async fn test_notify_all_delivers_identical_payloads() {
        let notifier = Notifier::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = mpsc::channel(4);
            notifier.subscribe(tx);
            receivers.push(rx);
        }

        notifier.notify_all(Bytes::from_static(b"hello there"));

        for rx in &mut receivers {
            assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"hello there"));
        }
    }

    #[tokio::test]
    async fn test_notify_one_targets_single_subscriber() {
        let notifier = Notifier::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let _id1 = notifier.subscribe(tx1);
        let id2 = notifier.subscribe(tx2);

        notifier.notify_one(id2, Bytes::from_static(b"only you"));

        assert_eq!(rx2.recv().await.unwrap(), Bytes::from_static(b"only you"));
        assert!(rx1.try_recv().is_err());

        // Unknown id is logged and ignored
        notifier.notify_one(99, Bytes::from_static(b"nobody"));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_dropped() {
        let notifier = Notifier::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(4);
        notifier.subscribe(slow_tx);
        notifier.subscribe(fast_tx);

        notifier.notify_all(Bytes::from_static(b"one"));
        notifier.notify_all(Bytes::from_static(b"two"));

        assert_eq!(notifier.len(), 1);
        assert_eq!(fast_rx.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(fast_rx.recv().await.unwrap(), Bytes::from_static(b"two"));

        // The buffered message is still readable, then the channel ends
        assert_eq!(slow_rx.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_receiver_is_dropped() {
        let notifier = Notifier::new();
        let (tx, rx) = mpsc::channel(1);
        notifier.subscribe(tx);
        drop(rx);

        notifier.notify_all(Bytes::from_static(b"gone"));
        assert_eq!(notifier.len(), 0);
    }

    #[tokio::test]
    async fn test_close_unsubscribes_everyone() {
        let notifier = Notifier::new();
        let (tx1, mut rx1) = mpsc::channel(1);
        let (tx2, mut rx2) = mpsc::channel(1);
        notifier.subscribe(tx1);
        notifier.subscribe(tx2);

        notifier.close();
        assert_eq!(notifier.len(), 0);
        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
    }
}
