// Fixed-size legacy layout used by older peers.
//
// 256-byte NUL-padded text field (at most 255 text bytes, always terminated)
// followed by a little-endian i64 timestamp at offset 256. 264 bytes total.

use byteorder::{ByteOrder, LittleEndian};

use super::message::Message;
use crate::error::{DecodeError, EncodeError};

pub const TEXT_FIELD: usize = 256;
pub const MAX_TEXT_LEN: usize = TEXT_FIELD - 1;
pub const FIXED_LEN: usize = TEXT_FIELD + 8;

pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut buf = vec![0u8; FIXED_LEN];
    encode_into(message, &mut buf)?;
    Ok(buf)
}

pub fn encode_into(message: &Message, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let text = message.text.as_bytes();
    if text.len() > MAX_TEXT_LEN {
        return Err(EncodeError::PayloadTooLarge {
            len: text.len(),
            max: MAX_TEXT_LEN,
        });
    }
    // An interior NUL would silently cut the text on decode.
    if let Some(offset) = text.iter().position(|&b| b == 0) {
        return Err(EncodeError::InteriorNul { offset });
    }
    if buf.len() < FIXED_LEN {
        return Err(EncodeError::BufferTooSmall {
            needed: FIXED_LEN,
            available: buf.len(),
        });
    }

    let field = &mut buf[..TEXT_FIELD];
    field.fill(0);
    field[..text.len()].copy_from_slice(text);
    LittleEndian::write_i64(&mut buf[TEXT_FIELD..FIXED_LEN], message.timestamp);
    Ok(FIXED_LEN)
}

pub fn decode(buf: &[u8]) -> Result<Message, DecodeError> {
    if buf.len() < FIXED_LEN {
        return Err(DecodeError::Malformed {
            len: buf.len(),
            min: FIXED_LEN,
        });
    }

    // Byte 255 is forced to NUL, mirroring what the legacy writer guarantees.
    let field = &buf[..MAX_TEXT_LEN];
    let end = field.iter().position(|&b| b == 0).unwrap_or(MAX_TEXT_LEN);
    let text = std::str::from_utf8(&field[..end])?.to_owned();
    let timestamp = LittleEndian::read_i64(&buf[TEXT_FIELD..FIXED_LEN]);

    Ok(Message { text, timestamp })
}
