//! Broadcast hub — fans enriched events out to live subscribers.
//!
//! Each subscriber owns a bounded queue drained by its connection writer.
//! `publish` serializes once and pushes the frame into every queue without
//! waiting. A subscriber whose queue is closed or full is removed; it never
//! holds up the pipeline or the other subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use geotrace_core::{EnrichedEvent, ServerMessage};

pub const DEFAULT_QUEUE: usize = 64;

pub type SubscriberId = u64;

/// A registered subscriber: serialized frames arrive on `frames` in
/// publish order. The receiver yields `None` once the hub drops it.
pub struct Subscription {
    pub id: SubscriberId,
    pub frames: mpsc::Receiver<Arc<str>>,
}

#[derive(Clone)]
pub struct BroadcastHub {
    subscribers: Arc<Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>>,
    next_id: Arc<AtomicU64>,
    queue: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE)
    }
}

impl BroadcastHub {
    /// `queue` is the number of frames a subscriber may fall behind by.
    pub fn new(queue: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            queue: queue.max(1),
        }
    }

    pub fn register(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue);
        let count = {
            let mut subs = self.subscribers.lock();
            subs.insert(id, tx);
            subs.len()
        };
        tracing::info!(subscriber = id, count, "subscriber registered");
        Subscription { id, frames: rx }
    }

    /// Returns false if the subscriber was already gone.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            tracing::info!(subscriber = id, "subscriber unregistered");
        }
        removed
    }

    /// Send `event` to every subscriber. Returns how many accepted it.
    pub fn publish(&self, event: EnrichedEvent) -> usize {
        let frame: Arc<str> = match ServerMessage::Packet(event).to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event");
                return 0;
            }
        };
        self.publish_frame(frame)
    }

    /// Push an already serialized frame. The lock is held across the whole
    /// fan-out so every subscriber sees frames in the same order.
    pub fn publish_frame(&self, frame: Arc<str>) -> usize {
        let mut delivered = 0;
        self.subscribers.lock().retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = id, "subscriber too slow, dropping");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::info!(subscriber = id, "subscriber gone, removing");
                false
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }
}
