//! Store configuration

use crate::protocol::MarkPolicy;

/// What the notifier does when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Wait for room in every subscriber's queue before the insert returns
    ///
    /// A stalled subscriber stalls ingestion for everyone waiting on the store.
    #[default]
    Blocking,
    /// Never wait; a full queue drops the event for that subscriber only
    ///
    /// The next event delivered to a lagging subscriber carries the number of
    /// events it missed.
    DropNewest,
}

/// Frame store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Events buffered per subscriber
    pub subscriber_capacity: usize,

    /// Behavior when a subscriber's buffer is full
    pub delivery: DeliveryPolicy,

    /// Treatment of irregular data marks while decoding
    pub mark_policy: MarkPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 16,
            delivery: DeliveryPolicy::Blocking,
            mark_policy: MarkPolicy::Lenient,
        }
    }
}

impl StoreConfig {
    /// Set the per-subscriber buffer size (at least 1)
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set the delivery policy
    pub fn delivery(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    /// Set the mark policy
    pub fn mark_policy(mut self, policy: MarkPolicy) -> Self {
        self.mark_policy = policy;
        self
    }
}
