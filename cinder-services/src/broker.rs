//! In-process publish/subscribe broker for stream sessions
//!
//! Subscribers register a bounded queue under a channel. Publishing never
//! waits on a subscriber: a full queue simply misses the message.

use cinder_core::Channel;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

/// A pre-encoded message; fan-out only clones the pointer
pub type BrokerMessage = Arc<str>;

/// Receiving half of a subscriber queue
pub type QueueReceiver = mpsc::Receiver<BrokerMessage>;

/// Unique identifier of a subscriber queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Sending half of a bounded subscriber queue
///
/// Equality and hashing go by id, so registering the same queue twice under
/// a channel is a no-op.
#[derive(Debug, Clone)]
pub struct SubscriberQueue {
    id: SubscriberId,
    tx: mpsc::Sender<BrokerMessage>,
}

impl SubscriberQueue {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl PartialEq for SubscriberQueue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriberQueue {}

impl Hash for SubscriberQueue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Delivery counts of a [`EventBroker::publish_to_entity`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Wildcard subscribers reached
    pub global: usize,
    /// Campaign subscribers reached
    #[serde(rename = "campaign")]
    pub scoped: usize,
}

type Subscribers = HashMap<SubscriberId, mpsc::Sender<BrokerMessage>>;

/// Multi-channel broker with a wildcard channel
pub struct EventBroker {
    next_id: AtomicU64,
    /// Channel -> subscribers; the wildcard entry is never removed
    channels: Mutex<HashMap<Channel, Subscribers>>,
}

impl EventBroker {
    pub fn new() -> Self {
        let mut channels = HashMap::new();
        channels.insert(Channel::All, Subscribers::new());
        Self {
            next_id: AtomicU64::new(1),
            channels: Mutex::new(channels),
        }
    }

    /// Allocate a bounded queue for a new subscriber
    pub fn queue(&self, capacity: usize) -> (SubscriberQueue, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        (SubscriberQueue { id, tx }, rx)
    }

    /// Register `queue` under `channel`
    pub fn subscribe(&self, channel: &Channel, queue: &SubscriberQueue) {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.clone())
            .or_default()
            .insert(queue.id, queue.tx.clone());
        drop(channels);

        debug!("{} subscribed to {}", queue.id, channel);
    }

    /// Remove `queue` from `channel`
    ///
    /// Emptied campaign channels are dropped; absent entries are ignored.
    pub fn unsubscribe(&self, channel: &Channel, queue: &SubscriberQueue) {
        let mut channels = self.channels.lock();
        if let Some(subscribers) = channels.get_mut(channel) {
            subscribers.remove(&queue.id);
            if subscribers.is_empty() && !channel.is_wildcard() {
                channels.remove(channel);
            }
        }
        drop(channels);

        debug!("{} unsubscribed from {}", queue.id, channel);
    }

    /// Offer `message` to every current subscriber of `channel`
    ///
    /// Returns how many queues accepted it. Full or closed queues are
    /// skipped.
    pub fn publish(&self, channel: &Channel, message: &BrokerMessage) -> usize {
        let targets: Vec<(SubscriberId, mpsc::Sender<BrokerMessage>)> = {
            let channels = self.channels.lock();
            match channels.get(channel) {
                Some(subscribers) => subscribers
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(message)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => trace!("{} is full, dropping message on {}", id, channel),
                Err(TrySendError::Closed(_)) => trace!("{} is closed, dropping message on {}", id, channel),
            }
        }
        delivered
    }

    /// Publish to the wildcard channel and to the campaign's own channel
    pub fn publish_to_entity(&self, entity_id: &str, message: &BrokerMessage) -> DeliveryReport {
        let global = self.publish(&Channel::All, message);
        let channel = Channel::for_campaign(Some(entity_id));
        let scoped = if channel.is_wildcard() {
            0
        } else {
            self.publish(&channel, message)
        };

        debug!(
            "Published to {}: {} global, {} scoped",
            entity_id, global, scoped
        );
        DeliveryReport { global, scoped }
    }

    /// Subscriber count per channel key
    pub fn stats(&self) -> BTreeMap<String, usize> {
        self.channels
            .lock()
            .iter()
            .map(|(channel, subscribers)| (channel.key().to_string(), subscribers.len()))
            .collect()
    }

    /// Number of subscribers of a channel
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroker")
            .field("channels", &self.stats())
            .finish()
    }
}
