//! Frame history index
//!
//! `collector → protocol → value → [frame, ...]`. Keys are created on first
//! insert and never removed; each bucket only ever grows, in insertion order.
//!
//! [`FrameStore`] does no locking of its own. Every call is expected to run
//! under the exclusive access handed out by
//! [`AccessCoordinator`](super::AccessCoordinator).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Serialize;

use crate::frame::{FrameRecord, NewFrameEvent, TaggedFrame};
use crate::protocol::{self, DecodeError, ProtocolId};

use super::config::StoreConfig;
use super::error::{LookupError, SubscriptionError};
use super::notifier::{FrameNotifier, SubscriberRegistry, Subscription};
use super::stats::StoreStats;

type ValueIndex = HashMap<String, Vec<FrameRecord>>;
type ProtocolIndex = HashMap<ProtocolId, ValueIndex>;

/// Stored value and how many frames carried it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueLength {
    pub value: String,
    pub length: usize,
}

/// Overview of the whole index: collector → protocol name → values
pub type Summary = BTreeMap<String, BTreeMap<String, Vec<ValueLength>>>;

/// Full history of one collector: protocol name → value → frames
pub type CollectorDump = BTreeMap<String, BTreeMap<String, Vec<FrameRecord>>>;

/// Full history: collector → protocol name → value → frames
pub type Dump = BTreeMap<String, CollectorDump>;

/// Insert and query access to the frame history
#[async_trait]
pub trait FrameRepository: Send {
    /// Decode and store a frame, then notify subscribers
    ///
    /// A frame that fails to decode leaves the store untouched and notifies
    /// nobody.
    async fn insert(&mut self, tagged: TaggedFrame) -> Result<NewFrameEvent, DecodeError>;

    /// All collectors seen so far
    fn collector_ids(&self) -> Vec<String>;

    /// Protocols stored for a collector
    fn protocol_ids(&self, collector_id: &str) -> Result<Vec<ProtocolId>, LookupError>;

    /// Values stored for a collector and protocol
    fn values(&self, collector_id: &str, protocol: ProtocolId) -> Result<Vec<String>, LookupError>;

    /// Full history of one value, oldest first
    fn frames(
        &self,
        collector_id: &str,
        protocol: ProtocolId,
        value: &str,
    ) -> Result<&[FrameRecord], LookupError>;

    /// Frame counts for every stored value
    fn summary(&self) -> Summary;

    /// Every stored frame, or only those of one collector
    fn dump(&self, collector_id: Option<&str>) -> Result<Dump, LookupError>;
}

/// In-memory frame history plus its subscriber registry
pub struct FrameStore {
    index: HashMap<String, ProtocolIndex>,
    notifier: SubscriberRegistry,
    config: StoreConfig,
    frames_inserted: u64,
    decode_failures: u64,
}

impl FrameStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with custom configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            index: HashMap::new(),
            notifier: SubscriberRegistry::new(config.subscriber_capacity, config.delivery),
            config,
            frames_inserted: 0,
            decode_failures: 0,
        }
    }

    /// Snapshot of the store counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            frames_inserted: self.frames_inserted,
            decode_failures: self.decode_failures,
            events_delivered: self.notifier.delivered(),
            events_dropped: self.notifier.dropped(),
            subscribers: self.notifier.len(),
            collectors: self.index.len(),
        }
    }

    /// Append a record, creating missing key levels; returns the bucket length
    fn append(
        &mut self,
        collector_id: &str,
        protocol: ProtocolId,
        value: &str,
        record: FrameRecord,
    ) -> usize {
        let protocols = self
            .index
            .entry(collector_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(collector = %collector_id, "New collector");
                ProtocolIndex::new()
            });

        let values = protocols.entry(protocol).or_insert_with(|| {
            tracing::debug!(collector = %collector_id, protocol = %protocol, "New protocol");
            ValueIndex::new()
        });

        let frames = values.entry(value.to_string()).or_insert_with(|| {
            tracing::debug!(
                collector = %collector_id,
                protocol = %protocol,
                value = %value,
                "New value"
            );
            Vec::with_capacity(1)
        });

        frames.push(record);
        frames.len()
    }

    fn collector_dump(protocols: &ProtocolIndex) -> CollectorDump {
        protocols
            .iter()
            .map(|(protocol, values)| {
                let frames = values
                    .iter()
                    .map(|(value, frames)| (value.clone(), frames.clone()))
                    .collect();
                (protocol.to_string(), frames)
            })
            .collect()
    }

    fn protocol_index(&self, collector_id: &str) -> Result<&ProtocolIndex, LookupError> {
        self.index
            .get(collector_id)
            .ok_or_else(|| LookupError::CollectorNotFound(collector_id.to_string()))
    }

    fn value_index(
        &self,
        collector_id: &str,
        protocol: ProtocolId,
    ) -> Result<&ValueIndex, LookupError> {
        self.protocol_index(collector_id)?
            .get(&protocol)
            .ok_or_else(|| LookupError::ProtocolNotFound {
                collector: collector_id.to_string(),
                protocol,
            })
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameRepository for FrameStore {
    async fn insert(&mut self, tagged: TaggedFrame) -> Result<NewFrameEvent, DecodeError> {
        let pulses = tagged.frame.pulses();

        let decoded = match protocol::decode(&pulses, self.config.mark_policy) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.decode_failures += 1;
                tracing::warn!(
                    collector = %tagged.collector_id,
                    pulses = pulses.len(),
                    error = %e,
                    "Frame rejected"
                );
                return Err(e);
            }
        };

        let count = self.append(
            &tagged.collector_id,
            decoded.protocol,
            &decoded.value,
            pulses.clone(),
        );
        self.frames_inserted += 1;

        tracing::info!(
            collector = %tagged.collector_id,
            protocol = %decoded.protocol,
            value = %decoded.value,
            frames = count,
            "Frame stored"
        );

        let event = NewFrameEvent::new(tagged.collector_id, decoded.protocol, decoded.value, pulses);
        self.notifier.broadcast(&event).await;

        Ok(event)
    }

    fn collector_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn protocol_ids(&self, collector_id: &str) -> Result<Vec<ProtocolId>, LookupError> {
        let mut ids: Vec<ProtocolId> = self
            .protocol_index(collector_id)?
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn values(&self, collector_id: &str, protocol: ProtocolId) -> Result<Vec<String>, LookupError> {
        let mut values: Vec<String> = self
            .value_index(collector_id, protocol)?
            .keys()
            .cloned()
            .collect();
        values.sort();
        Ok(values)
    }

    fn frames(
        &self,
        collector_id: &str,
        protocol: ProtocolId,
        value: &str,
    ) -> Result<&[FrameRecord], LookupError> {
        self.value_index(collector_id, protocol)?
            .get(value)
            .map(Vec::as_slice)
            .ok_or_else(|| LookupError::ValueNotFound {
                collector: collector_id.to_string(),
                protocol,
                value: value.to_string(),
            })
    }

    fn summary(&self) -> Summary {
        self.index
            .iter()
            .map(|(collector, protocols)| {
                let per_protocol: BTreeMap<String, Vec<ValueLength>> = protocols
                    .iter()
                    .map(|(protocol, values)| {
                        let mut lengths: Vec<ValueLength> = values
                            .iter()
                            .map(|(value, frames)| ValueLength {
                                value: value.clone(),
                                length: frames.len(),
                            })
                            .collect();
                        lengths.sort_by(|a, b| a.value.cmp(&b.value));
                        (protocol.to_string(), lengths)
                    })
                    .collect();
                (collector.clone(), per_protocol)
            })
            .collect()
    }

    fn dump(&self, collector_id: Option<&str>) -> Result<Dump, LookupError> {
        match collector_id {
            Some(id) => {
                let protocols = self.protocol_index(id)?;
                Ok(Dump::from([(id.to_string(), Self::collector_dump(protocols))]))
            }
            None => Ok(self
                .index
                .iter()
                .map(|(id, protocols)| (id.clone(), Self::collector_dump(protocols)))
                .collect()),
        }
    }
}

#[async_trait]
impl FrameNotifier for FrameStore {
    fn notify(&mut self, subscriber_id: &str) -> Result<Subscription, SubscriptionError> {
        self.notifier.notify(subscriber_id)
    }

    fn un_notify(&mut self, subscriber_id: &str) -> Result<(), SubscriptionError> {
        self.notifier.un_notify(subscriber_id)
    }

    async fn broadcast(&mut self, event: &NewFrameEvent) {
        self.notifier.broadcast(event).await;
    }
}
