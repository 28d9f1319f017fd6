//! Frame types shared by the decoder, the store and the front end
//!
//! A collector posts a [`TaggedFrame`]: its own id plus a [`RawFrame`] of
//! timer ticks. Everything past ingestion works in microseconds, as
//! [`Pulse`] values produced by [`RawFrame::pulses`].

use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolId;

/// One infrared pulse: how long the carrier was on, then off
///
/// Serialized as a two-element array `[mark, space]`, the same shape the
/// collectors use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct Pulse {
    /// Carrier-on duration
    pub mark: u64,
    /// Carrier-off duration
    pub space: u64,
}

impl Pulse {
    /// Create a pulse
    pub fn new(mark: u64, space: u64) -> Self {
        Self { mark, space }
    }
}

impl From<[u64; 2]> for Pulse {
    fn from([mark, space]: [u64; 2]) -> Self {
        Self { mark, space }
    }
}

impl From<Pulse> for [u64; 2] {
    fn from(pulse: Pulse) -> Self {
        [pulse.mark, pulse.space]
    }
}

impl std::fmt::Display for Pulse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.mark, self.space)
    }
}

/// A capture as sent by a collector, still in timer ticks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Microseconds per tick
    pub resolution: u32,
    /// `[mark, space]` tick pairs; the first one is the header
    pub data: Vec<[u32; 2]>,
}

impl RawFrame {
    /// Create a raw frame
    pub fn new(resolution: u32, data: Vec<[u32; 2]>) -> Self {
        Self { resolution, data }
    }

    /// Scale every tick pair to microseconds, keeping the capture order
    pub fn pulses(&self) -> Vec<Pulse> {
        let scale = u64::from(self.resolution);
        self.data
            .iter()
            .map(|[mark, space]| Pulse::new(u64::from(*mark) * scale, u64::from(*space) * scale))
            .collect()
    }

    /// Number of pulses, header included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the capture holds no pulses at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A raw frame together with the id of the collector that captured it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedFrame {
    /// Collector that observed the transmission
    #[serde(rename = "collectorId")]
    pub collector_id: String,
    /// The capture itself
    pub frame: RawFrame,
}

impl TaggedFrame {
    /// Create a tagged frame
    pub fn new(collector_id: impl Into<String>, frame: RawFrame) -> Self {
        Self {
            collector_id: collector_id.into(),
            frame,
        }
    }
}

/// The stored, microsecond-scaled history entry of one frame
pub type FrameRecord = Vec<Pulse>;

/// Event pushed to every subscriber when a frame is stored
///
/// Cheap enough to clone per subscriber: frames are a few dozen pulses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFrameEvent {
    /// Collector that observed the frame
    #[serde(rename = "collectorId")]
    pub collector_id: String,
    /// Canonical protocol name
    #[serde(rename = "protocolID")]
    pub protocol_id: String,
    /// Decoded value
    pub value: String,
    /// Scaled pulses, header first
    pub frame: FrameRecord,
    /// Events this subscriber missed just before this one
    #[serde(default, skip_serializing_if = "is_zero")]
    pub missed: u64,
}

impl NewFrameEvent {
    /// Create an event for a freshly stored frame
    pub fn new(
        collector_id: impl Into<String>,
        protocol: ProtocolId,
        value: impl Into<String>,
        frame: FrameRecord,
    ) -> Self {
        Self {
            collector_id: collector_id.into(),
            protocol_id: protocol.to_string(),
            value: value.into(),
            frame,
            missed: 0,
        }
    }
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}
