//! Store statistics

use serde::Serialize;

/// Counters kept by the frame store since process start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Frames decoded and stored
    pub frames_inserted: u64,
    /// Frames rejected by the decoder
    pub decode_failures: u64,
    /// Events handed to subscriber queues
    pub events_delivered: u64,
    /// Events dropped because a subscriber's queue was full
    pub events_dropped: u64,
    /// Live subscribers
    pub subscribers: usize,
    /// Distinct collectors seen
    pub collectors: usize,
}
