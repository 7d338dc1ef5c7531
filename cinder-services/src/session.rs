//! Stream sessions
//!
//! One session per connected stream client. The session owns a broker
//! queue, forwards its messages to the client transport and emits
//! heartbeats while the channel is idle.

use async_trait::async_trait;
use chrono::Utc;
use cinder_core::{Channel, StreamEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broker::{BrokerMessage, EventBroker, SubscriberQueue};

/// Per-session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capacity of the broker queue
    pub queue_capacity: usize,
    /// Idle time before a heartbeat is sent
    pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 200,
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}

/// The client went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream transport closed")]
pub struct TransportClosed;

/// Delivery side of a stream connection
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Send one encoded frame to the client
    async fn send(&self, frame: BrokerMessage) -> Result<(), TransportClosed>;

    /// Resolves once the client has disconnected
    async fn closed(&self);
}

/// Transport over a channel whose receiver feeds the response body
///
/// Dropping the receiver (the client disconnected) closes the transport.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<BrokerMessage>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BrokerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SessionTransport for ChannelTransport {
    async fn send(&self, frame: BrokerMessage) -> Result<(), TransportClosed> {
        self.tx.send(frame).await.map_err(|_| TransportClosed)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The cancellation token fired
    Cancelled,
    /// The client disconnected
    Disconnected,
    /// Every sender of the queue was dropped
    QueueClosed,
}

/// Unsubscribes the session queue however the session ends
struct SubscriptionGuard<'a> {
    broker: &'a EventBroker,
    channel: &'a Channel,
    queue: &'a SubscriberQueue,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.channel, self.queue);
    }
}

enum Step {
    Forward(BrokerMessage),
    Heartbeat,
    Exit(SessionExit),
}

fn encode(event: &StreamEvent) -> Option<BrokerMessage> {
    match event.to_frame(None) {
        Ok(frame) => Some(Arc::from(frame)),
        Err(e) => {
            error!("Failed to encode {} event: {}", event.name(), e);
            None
        }
    }
}

/// A single client's subscription to one channel
pub struct StreamSession {
    broker: Arc<EventBroker>,
    channel: Channel,
    config: SessionConfig,
}

impl StreamSession {
    pub fn new(broker: Arc<EventBroker>, channel: Channel, config: SessionConfig) -> Self {
        Self {
            broker,
            channel,
            config,
        }
    }

    /// Run until the client disconnects or `cancel` fires
    ///
    /// The queue is subscribed for exactly the lifetime of this future.
    pub async fn run<T: SessionTransport>(self, transport: T, cancel: CancellationToken) -> SessionExit {
        let (queue, mut rx) = self.broker.queue(self.config.queue_capacity);
        self.broker.subscribe(&self.channel, &queue);
        let _guard = SubscriptionGuard {
            broker: &self.broker,
            channel: &self.channel,
            queue: &queue,
        };
        info!(
            "Stream {} opened on {} ({} subscribers)",
            queue.id(),
            self.channel,
            self.broker.subscriber_count(&self.channel)
        );

        let ready = StreamEvent::Ready {
            channel: self.channel.clone(),
            connected_at: Utc::now(),
        };
        if let Some(frame) = encode(&ready) {
            if transport.send(frame).await.is_err() {
                info!("Stream {} closed before ready", queue.id());
                return SessionExit::Disconnected;
            }
        }

        let exit = loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Exit(SessionExit::Cancelled),
                _ = transport.closed() => Step::Exit(SessionExit::Disconnected),
                received = timeout(self.config.heartbeat_interval, rx.recv()) => match received {
                    Ok(Some(message)) => Step::Forward(message),
                    Ok(None) => Step::Exit(SessionExit::QueueClosed),
                    Err(_) => Step::Heartbeat,
                },
            };

            let frame = match step {
                Step::Forward(message) => message,
                Step::Heartbeat => {
                    let heartbeat = StreamEvent::Heartbeat {
                        channel: self.channel.clone(),
                        ts: Utc::now(),
                    };
                    match encode(&heartbeat) {
                        Some(frame) => frame,
                        None => continue,
                    }
                }
                Step::Exit(exit) => break exit,
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionExit::Cancelled,
                sent = transport.send(frame) => sent,
            };
            if sent.is_err() {
                break SessionExit::Disconnected;
            }
            debug!("Stream {} forwarded a frame", queue.id());
        };

        info!("Stream {} on {} ended: {:?}", queue.id(), self.channel, exit);
        exit
    }
}
