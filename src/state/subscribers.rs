//! Registry of streaming clients
//!
//! The registry only queues lines. Each `listen` connection drains its own
//! queue onto the socket, so a client that stops reading never holds up a
//! broadcast.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::Snapshot;

/// Receiving end handed to the connection that asked to `listen`
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub updates: mpsc::UnboundedReceiver<String>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

/// Open subscriber channels; members are removed only when a send to them fails
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel whose first queued line is `current`
    ///
    /// Returns `None` only if the snapshot cannot be encoded.
    pub async fn register(&self, current: &Snapshot) -> Option<Subscription> {
        let line = match current.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode snapshot for new subscriber: {}", e);
                return None;
            }
        };

        let (tx, updates) = mpsc::unbounded_channel();
        // Cannot fail, the receiver is still in hand
        let _ = tx.send(line);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(Subscriber { id, tx });
        debug!(subscriber = id, total = subscribers.len(), "Subscriber registered");
        Some(Subscription { id, updates })
    }

    /// Queue `snapshot` for every subscriber, dropping those whose connection is gone
    ///
    /// Returns how many subscribers remain.
    pub async fn broadcast(&self, snapshot: &Snapshot) -> usize {
        let line = match snapshot.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode snapshot for broadcast: {}", e);
                return 0;
            }
        };

        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|subscriber| {
            let alive = subscriber.tx.send(line.clone()).is_ok();
            if !alive {
                debug!(subscriber = subscriber.id, "Removing subscriber");
            }
            alive
        });
        subscribers.len()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every channel; connections see their queue end and close
    pub async fn close_all(&self) {
        let mut subscribers = self.subscribers.lock().await;
        let count = subscribers.len();
        subscribers.clear();
        if count > 0 {
            debug!("Closed {} subscriber(s)", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TimerSettings, state::TimerState};
    use pretty_assertions::assert_eq;

    fn snapshot() -> Snapshot {
        TimerState::new(TimerSettings::default()).snapshot()
    }

    fn decode(line: &str) -> Snapshot {
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[tokio::test]
    async fn register_queues_current_snapshot() {
        let registry = SubscriberRegistry::new();

        let mut subscription = registry.register(&snapshot()).await.unwrap();
        assert_eq!(registry.len().await, 1);

        let line = subscription.updates.recv().await.unwrap();
        assert_eq!(decode(&line), snapshot());
    }

    #[tokio::test]
    async fn ids_are_distinct() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(&snapshot()).await.unwrap();
        let b = registry.register(&snapshot()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn broadcast_drops_only_the_dead_subscriber() {
        let registry = SubscriberRegistry::new();
        let mut subscriptions = Vec::new();
        for _ in 0..3 {
            let mut subscription = registry.register(&snapshot()).await.unwrap();
            subscription.updates.recv().await.unwrap();
            subscriptions.push(subscription);
        }

        let dead = subscriptions.remove(1);
        drop(dead);

        let mut state = TimerState::new(TimerSettings::default());
        state.toggle();
        let update = state.snapshot();

        assert_eq!(registry.broadcast(&update).await, 2);
        assert_eq!(registry.len().await, 2);
        for subscription in subscriptions.iter_mut() {
            let line = subscription.updates.recv().await.unwrap();
            assert_eq!(decode(&line), update);
        }
    }

    #[tokio::test]
    async fn unread_subscriber_is_kept() {
        let registry = SubscriberRegistry::new();
        let _idle = registry.register(&snapshot()).await.unwrap();

        for _ in 0..10_000 {
            assert_eq!(registry.broadcast(&snapshot()).await, 1);
        }
    }

    #[tokio::test]
    async fn close_all_ends_streams() {
        let registry = SubscriberRegistry::new();
        let mut subscription = registry.register(&snapshot()).await.unwrap();
        subscription.updates.recv().await.unwrap();

        registry.close_all().await;

        assert!(registry.is_empty().await);
        assert_eq!(subscription.updates.recv().await, None);
    }
}
