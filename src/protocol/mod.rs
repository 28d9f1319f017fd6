//! Infrared protocol identification and decoding
//!
//! Decoding is a pure function of the scaled pulses: the header pulse picks
//! the protocol, the data pulses carry the value.
//!
//! Candidate protocols are tried in a fixed priority order and the first one
//! whose header matcher accepts the frame wins. A frame no candidate claims is
//! reported as [`ProtocolId::Unknown`] with an empty value; that is not an
//! error. Only a frame whose header matched but whose body cannot be read
//! produces a [`DecodeError`].
//!
//! # Compatibility
//!
//! The deployed collectors produce marks slightly outside the nominal timing
//! windows. [`MarkPolicy::Lenient`] reads such a mark as a `0` bit, which is
//! how existing installations have always decoded them.

pub mod error;
pub mod nec;

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::Pulse;

pub use error::DecodeError;
pub use nec::Nec;

/// Identity of a wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ProtocolId {
    /// NEC: 9 ms header, 32 pulse-distance coded bits
    Nec,
    /// No candidate protocol matched the header
    Unknown,
}

impl ProtocolId {
    /// Canonical name of the protocol
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolId::Nec => "NEC",
            ProtocolId::Unknown => "Unknown",
        }
    }

    /// Look a protocol up by its canonical name, falling back to `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name {
            "NEC" => ProtocolId::Nec,
            _ => ProtocolId::Unknown,
        }
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for ProtocolId {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ProtocolId> for &'static str {
    fn from(id: ProtocolId) -> Self {
        id.name()
    }
}

/// How data marks outside the short-mark window are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkPolicy {
    /// Read the bit as `0` and carry on
    #[default]
    Lenient,
    /// Reject the frame
    Strict,
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Matched protocol, or `Unknown`
    pub protocol: ProtocolId,
    /// 8 upper-case hex digits, empty for `Unknown`
    pub value: String,
}

impl Decoded {
    /// Outcome for a frame no protocol claimed
    pub fn unknown() -> Self {
        Self {
            protocol: ProtocolId::Unknown,
            value: String::new(),
        }
    }
}

/// A protocol the decoder can recognize
pub trait ProtocolDecoder: Sync {
    /// Identity reported when this decoder claims a frame
    fn id(&self) -> ProtocolId;

    /// Whether the header pulse belongs to this protocol
    fn matches_header(&self, header: &Pulse) -> bool;

    /// Decode the data pulses (everything after the header)
    fn decode_value(&self, data: &[Pulse], policy: MarkPolicy) -> Result<String, DecodeError>;
}

/// Candidates in priority order
static CANDIDATES: &[&dyn ProtocolDecoder] = &[&Nec];

/// Identify and decode a frame of scaled pulses
pub fn decode(pulses: &[Pulse], policy: MarkPolicy) -> Result<Decoded, DecodeError> {
    let Some((header, data)) = pulses.split_first() else {
        return Ok(Decoded::unknown());
    };

    match CANDIDATES.iter().find(|c| c.matches_header(header)) {
        Some(candidate) => Ok(Decoded {
            protocol: candidate.id(),
            value: candidate.decode_value(data, policy)?,
        }),
        None => Ok(Decoded::unknown()),
    }
}

/// Whether `value` lies strictly inside ±10 % of `nominal`
pub(crate) fn within_tolerance(value: f64, nominal: f64) -> bool {
    value > nominal * 0.90 && value < nominal * 1.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names_round_trip() {
        for id in [ProtocolId::Nec, ProtocolId::Unknown] {
            assert_eq!(ProtocolId::from_name(id.name()), id);
        }
        assert_eq!("RC5".parse::<ProtocolId>().unwrap(), ProtocolId::Unknown);
        assert_eq!(ProtocolId::Nec.to_string(), "NEC");
    }

    #[test]
    fn test_protocol_id_serde() {
        assert_eq!(serde_json::to_string(&ProtocolId::Nec).unwrap(), r#""NEC""#);
        let id: ProtocolId = serde_json::from_str(r#""whatever""#).unwrap();
        assert_eq!(id, ProtocolId::Unknown);
    }

    #[test]
    fn test_empty_frame_is_unknown() {
        let decoded = decode(&[], MarkPolicy::Lenient).unwrap();
        assert_eq!(decoded, Decoded::unknown());
    }

    #[test]
    fn test_unmatched_header_is_unknown() {
        // 3 ms header belongs to no supported protocol
        let pulses = vec![Pulse::new(3000, 3000); 40];
        let decoded = decode(&pulses, MarkPolicy::Strict).unwrap();

        assert_eq!(decoded.protocol, ProtocolId::Unknown);
        assert!(decoded.value.is_empty());
    }

    #[test]
    fn test_tolerance_is_exclusive() {
        assert!(within_tolerance(9000.0, 9000.0));
        assert!(!within_tolerance(8100.0, 9000.0));
        assert!(!within_tolerance(9900.0, 9000.0));
        assert!(within_tolerance(8101.0, 9000.0));
        assert!(within_tolerance(9899.0, 9000.0));
    }
}
