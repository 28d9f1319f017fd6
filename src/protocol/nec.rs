//! NEC protocol
//!
//! A 9 ms header mark followed by 32 data pulses. Every data pulse starts
//! with a short mark; a long space encodes `1`, a short space encodes `0`.
//! Bits are most significant first. The stop pulse that follows the 32nd
//! bit is ignored.

use crate::frame::Pulse;

use super::{within_tolerance, DecodeError, MarkPolicy, ProtocolDecoder, ProtocolId};

/// Header mark duration in microseconds
pub const HEADER_MARK_MICROS: f64 = 9000.0;

/// Short bit duration in microseconds
pub const BIT_SHORT_MICROS: f64 = 562.5;

/// Long bit duration in microseconds
pub const BIT_LONG_MICROS: f64 = 1687.5;

/// Number of data bits in a frame
pub const DATA_BITS: usize = 32;

/// NEC decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Nec;

fn is_short(micros: u64) -> bool {
    within_tolerance(micros as f64, BIT_SHORT_MICROS)
}

fn is_long(micros: u64) -> bool {
    within_tolerance(micros as f64, BIT_LONG_MICROS)
}

impl ProtocolDecoder for Nec {
    fn id(&self) -> ProtocolId {
        ProtocolId::Nec
    }

    fn matches_header(&self, header: &Pulse) -> bool {
        within_tolerance(header.mark as f64, HEADER_MARK_MICROS)
    }

    fn decode_value(&self, data: &[Pulse], policy: MarkPolicy) -> Result<String, DecodeError> {
        if data.len() < DATA_BITS {
            return Err(DecodeError::InsufficientPulses {
                protocol: ProtocolId::Nec,
                expected: DATA_BITS,
                found: data.len(),
            });
        }

        let mut value: u32 = 0;
        let mut irregular = 0usize;

        for (bit, pulse) in data[..DATA_BITS].iter().enumerate() {
            if !is_short(pulse.mark) {
                if policy == MarkPolicy::Strict {
                    return Err(DecodeError::IrregularMark {
                        protocol: ProtocolId::Nec,
                        bit,
                        pulse: *pulse,
                    });
                }
                irregular += 1;
                continue;
            }

            if is_long(pulse.space) {
                value |= 1 << (DATA_BITS - 1 - bit);
            } else if !is_short(pulse.space) {
                return Err(DecodeError::MalformedFrame {
                    protocol: ProtocolId::Nec,
                    bit,
                    pulse: *pulse,
                });
            }
        }

        if irregular > 0 {
            tracing::warn!(
                protocol = %ProtocolId::Nec,
                irregular_marks = irregular,
                "Irregular marks read as 0 bits"
            );
        }

        Ok(format!("{:08X}", value))
    }
}
