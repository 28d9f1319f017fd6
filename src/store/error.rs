//! Store error types
//!
//! Every error here is local and recoverable: it goes back to the caller
//! that asked, and the store stays usable.

use crate::protocol::{DecodeError, ProtocolId};

/// A requested key segment does not exist in the index
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No frame was ever stored for this collector
    #[error("collector '{0}' cannot be found")]
    CollectorNotFound(String),
    /// The collector never reported this protocol
    #[error("protocol '{protocol}' cannot be found for collector '{collector}'")]
    ProtocolNotFound {
        collector: String,
        protocol: ProtocolId,
    },
    /// The collector never reported this value under the protocol
    #[error("value '{value}' cannot be found for {collector}/{protocol}")]
    ValueNotFound {
        collector: String,
        protocol: ProtocolId,
        value: String,
    },
}

/// Subscriber registration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The id already has a live registration
    #[error("subscriber '{0}' is already subscribed")]
    AlreadySubscribed(String),
    /// The id has no registration to remove
    #[error("subscriber '{0}' is not subscribed")]
    NotSubscribed(String),
}

/// Any error a store operation can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Frame could not be decoded, nothing was stored
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Query named a key that does not exist
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Subscribe or unsubscribe was rejected
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}
