//! Inbound command parsing
//!
//! The control protocol is ASCII text matching `pair (',' pair)*`
//! where `pair = digits ':' digits`; a trailing separator is optional.
//! Parsing is a pure function of the buffer: no channel state is
//! touched here, so a malformed command can be rejected in its
//! entirety without partially applying earlier pairs.

use crate::error::ProtocolError;

/// Which half of a `channel:value` pair is being accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Channel,
    Value,
}

/// Parse one received buffer into an ordered list of (channel, value)
/// pairs.
///
/// Channels here are still the raw wire numbers (1-based DMX
/// addresses); range validation happens when the command is applied.
/// Accumulation saturates, so absurdly long digit runs fail range
/// validation instead of wrapping.
pub fn parse_command(buf: &[u8]) -> Result<Vec<(u32, u32)>, ProtocolError> {
    let mut pairs = Vec::new();
    let mut channel = 0u32;
    let mut value = 0u32;
    let mut part = Part::Channel;
    let mut pending = false;

    for (position, &byte) in buf.iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as u32;
                match part {
                    Part::Channel => channel = channel.saturating_mul(10).saturating_add(digit),
                    Part::Value => value = value.saturating_mul(10).saturating_add(digit),
                }
                pending = true;
            }
            b':' => {
                part = Part::Value;
                pending = true;
            }
            b',' => {
                pairs.push((channel, value));
                channel = 0;
                value = 0;
                part = Part::Channel;
                pending = false;
            }
            _ => return Err(ProtocolError::Malformed { position, byte }),
        }
    }

    // End of buffer acts as an implied terminator for the last pair.
    if pending {
        pairs.push((channel, value));
    }

    Ok(pairs)
}
