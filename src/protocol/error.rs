//! Decoder error types

use crate::frame::Pulse;

use super::ProtocolId;

/// Error raised when a frame's header matched a protocol but its body did not
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer data pulses than the protocol carries bits
    #[error("{protocol} frame has {found} data pulses, expected at least {expected}")]
    InsufficientPulses {
        protocol: ProtocolId,
        expected: usize,
        found: usize,
    },

    /// Short mark followed by a space that is neither short nor long
    #[error("malformed {protocol} frame: bit {bit} has pulse {pulse}")]
    MalformedFrame {
        protocol: ProtocolId,
        bit: usize,
        pulse: Pulse,
    },

    /// Mark that is not a short mark, rejected under the strict mark policy
    #[error("irregular {protocol} mark at bit {bit}: pulse {pulse}")]
    IrregularMark {
        protocol: ProtocolId,
        bit: usize,
        pulse: Pulse,
    },
}
