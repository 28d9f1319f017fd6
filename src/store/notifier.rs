//! Subscriber registry and new-frame fan-out
//!
//! Each live observer owns one bounded queue. Broadcasting clones the event
//! into every queue; how a full queue is handled is decided by the
//! [`DeliveryPolicy`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::frame::NewFrameEvent;

use super::config::DeliveryPolicy;
use super::error::SubscriptionError;

/// Receiving end handed to a subscriber on registration
#[derive(Debug)]
pub struct Subscription {
    id: String,
    rx: mpsc::Receiver<NewFrameEvent>,
}

impl Subscription {
    /// Id this subscription was registered under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the subscriber has been removed from the registry.
    pub async fn recv(&mut self) -> Option<NewFrameEvent> {
        self.rx.recv().await
    }

    /// Take an already queued event without waiting
    pub fn try_recv(&mut self) -> Option<NewFrameEvent> {
        self.rx.try_recv().ok()
    }
}

struct Subscriber {
    tx: mpsc::Sender<NewFrameEvent>,
    /// Events dropped since the last successful delivery
    missed: u64,
}

/// Ability to register observers and push events to them
#[async_trait]
pub trait FrameNotifier: Send {
    /// Register a subscriber and return its receiving end
    fn notify(&mut self, subscriber_id: &str) -> Result<Subscription, SubscriptionError>;

    /// Remove a subscriber
    fn un_notify(&mut self, subscriber_id: &str) -> Result<(), SubscriptionError>;

    /// Deliver an event to every current subscriber
    async fn broadcast(&mut self, event: &NewFrameEvent);
}

/// Registry of live subscribers, one queue per id
pub struct SubscriberRegistry {
    subscribers: HashMap<String, Subscriber>,
    capacity: usize,
    policy: DeliveryPolicy,
    delivered: u64,
    dropped: u64,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new(capacity: usize, policy: DeliveryPolicy) -> Self {
        Self {
            subscribers: HashMap::new(),
            capacity: capacity.max(1),
            policy,
            delivered: 0,
            dropped: 0,
        }
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Events handed to queues so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Events dropped on full queues so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    async fn deliver(&mut self, event: &NewFrameEvent) {
        let mut closed = Vec::new();

        for (id, subscriber) in self.subscribers.iter_mut() {
            let mut event = event.clone();
            event.missed = subscriber.missed;

            let sent = match self.policy {
                DeliveryPolicy::Blocking => subscriber.tx.send(event).await.is_ok(),
                DeliveryPolicy::DropNewest => match subscriber.tx.try_send(event) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        subscriber.missed += 1;
                        self.dropped += 1;
                        tracing::warn!(
                            subscriber = %id,
                            missed = subscriber.missed,
                            "Subscriber falling behind, event dropped"
                        );
                        continue;
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
            };

            if sent {
                subscriber.missed = 0;
                self.delivered += 1;
            } else {
                closed.push(id.clone());
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "Subscriber gone, removed");
        }
    }
}

#[async_trait]
impl FrameNotifier for SubscriberRegistry {
    fn notify(&mut self, subscriber_id: &str) -> Result<Subscription, SubscriptionError> {
        if self.subscribers.contains_key(subscriber_id) {
            return Err(SubscriptionError::AlreadySubscribed(subscriber_id.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .insert(subscriber_id.to_string(), Subscriber { tx, missed: 0 });

        tracing::info!(
            subscriber = %subscriber_id,
            subscribers = self.subscribers.len(),
            "Subscriber added"
        );

        Ok(Subscription {
            id: subscriber_id.to_string(),
            rx,
        })
    }

    fn un_notify(&mut self, subscriber_id: &str) -> Result<(), SubscriptionError> {
        if self.subscribers.remove(subscriber_id).is_none() {
            return Err(SubscriptionError::NotSubscribed(subscriber_id.to_string()));
        }

        tracing::info!(
            subscriber = %subscriber_id,
            subscribers = self.subscribers.len(),
            "Subscriber removed"
        );
        Ok(())
    }

    async fn broadcast(&mut self, event: &NewFrameEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.deliver(event).await;
    }
}
