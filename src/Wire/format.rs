use std::fmt;
use std::str::FromStr;

use super::message::Message;
use super::{codec, fixed};
use crate::error::{DecodeError, EncodeError};

/// The payload layout a channel uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireFormat {
    /// `[u32 len][text][i64 timestamp]`, little-endian.
    #[default]
    LengthPrefixed,
    /// 256-byte NUL-padded text plus an i64 timestamp.
    Fixed,
}

impl WireFormat {
    /// Type name registered with the transport for this layout.
    pub fn type_name(self) -> &'static str {
        match self {
            WireFormat::LengthPrefixed => "SimpleMessage",
            WireFormat::Fixed => "HelloWorldMsg",
        }
    }

    pub fn serialized_size(self, message: &Message) -> usize {
        match self {
            WireFormat::LengthPrefixed => codec::serialized_size(message),
            WireFormat::Fixed => fixed::FIXED_LEN,
        }
    }

    /// Largest text this layout can carry under `limit`.
    pub fn max_text_len(self, limit: usize) -> usize {
        match self {
            WireFormat::LengthPrefixed => limit,
            WireFormat::Fixed => limit.min(fixed::MAX_TEXT_LEN),
        }
    }

    /// Largest text that fits a frame of at most `frame_limit` bytes, or
    /// `None` if not even an empty message fits.
    pub fn text_capacity(self, frame_limit: usize) -> Option<usize> {
        match self {
            WireFormat::LengthPrefixed => frame_limit.checked_sub(codec::MIN_ENCODED_LEN),
            WireFormat::Fixed => {
                (frame_limit >= fixed::FIXED_LEN).then_some(fixed::MAX_TEXT_LEN)
            }
        }
    }

    pub fn encode(self, message: &Message, limit: usize) -> Result<Vec<u8>, EncodeError> {
        match self {
            WireFormat::LengthPrefixed => codec::encode_with_limit(message, limit),
            WireFormat::Fixed => {
                let max = self.max_text_len(limit);
                if message.text.len() > max {
                    return Err(EncodeError::PayloadTooLarge {
                        len: message.text.len(),
                        max,
                    });
                }
                fixed::encode(message)
            }
        }
    }

    pub fn decode(self, buf: &[u8]) -> Result<Message, DecodeError> {
        match self {
            WireFormat::LengthPrefixed => codec::decode(buf),
            WireFormat::Fixed => fixed::decode(buf),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::LengthPrefixed => f.write_str("prefixed"),
            WireFormat::Fixed => f.write_str("fixed"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefixed" | "length-prefixed" => Ok(WireFormat::LengthPrefixed),
            "fixed" => Ok(WireFormat::Fixed),
            other => Err(format!("unknown wire format {other:?}")),
        }
    }
}
