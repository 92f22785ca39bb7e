// Length-prefixed wire codec.
//
// Layout (little-endian, no padding):
//
//   +----------------+----------------------+-------------------+
//   | u32 text_len   | text_len bytes UTF-8 | i64 timestamp     |
//   +----------------+----------------------+-------------------+
//     0..4             4..4+text_len          4+text_len..+8

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::message::Message;
use crate::error::{DecodeError, EncodeError};

/// Size of the text length prefix.
pub const LEN_PREFIX: usize = 4;

/// Size of the trailing timestamp.
pub const TIMESTAMP_LEN: usize = 8;

/// Smallest buffer `decode` accepts (empty text).
pub const MIN_ENCODED_LEN: usize = LEN_PREFIX + TIMESTAMP_LEN;

/// Default maximum text length, matching a typical 64 KiB transport payload.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Exact number of bytes `encode` produces for `message`.
#[inline]
pub fn serialized_size(message: &Message) -> usize {
    LEN_PREFIX + message.text.len() + TIMESTAMP_LEN
}

/// Encode with the default `MAX_PAYLOAD_SIZE` limit.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    encode_with_limit(message, MAX_PAYLOAD_SIZE)
}

/// Encode, rejecting text longer than `max_text_len` bytes.
pub fn encode_with_limit(message: &Message, max_text_len: usize) -> Result<Vec<u8>, EncodeError> {
    check_len(message, max_text_len)?;
    let mut buf = vec![0u8; serialized_size(message)];
    write_fields(message, &mut buf)?;
    Ok(buf)
}

/// Encode into a caller-owned buffer. Returns the number of bytes written.
///
/// Never writes past `buf.len()`; a short buffer fails with `BufferTooSmall`
/// and leaves `buf` untouched.
pub fn encode_into(
    message: &Message,
    buf: &mut [u8],
    max_text_len: usize,
) -> Result<usize, EncodeError> {
    check_len(message, max_text_len)?;
    let needed = serialized_size(message);
    if buf.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }
    write_fields(message, &mut buf[..needed])?;
    Ok(needed)
}

/// Decode a buffer produced by `encode`.
///
/// The length prefix is validated against the bytes actually present before
/// any text is copied. Bytes after the timestamp are ignored.
pub fn decode(buf: &[u8]) -> Result<Message, DecodeError> {
    if buf.len() < MIN_ENCODED_LEN {
        return Err(DecodeError::Malformed {
            len: buf.len(),
            min: MIN_ENCODED_LEN,
        });
    }

    let mut cursor = Cursor::new(buf);
    let declared = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| DecodeError::Malformed {
            len: buf.len(),
            min: MIN_ENCODED_LEN,
        })? as usize;

    let available = buf.len() - MIN_ENCODED_LEN;
    if declared > available {
        return Err(DecodeError::Truncated { declared, available });
    }

    let text_end = LEN_PREFIX + declared;
    let text = std::str::from_utf8(&buf[LEN_PREFIX..text_end])?.to_owned();

    let mut tail = Cursor::new(&buf[text_end..text_end + TIMESTAMP_LEN]);
    let timestamp = tail
        .read_i64::<LittleEndian>()
        .map_err(|_| DecodeError::Truncated { declared, available })?;

    Ok(Message { text, timestamp })
}

fn check_len(message: &Message, max_text_len: usize) -> Result<(), EncodeError> {
    let len = message.text.len();
    // The prefix is a u32, so the hard ceiling applies even with a larger limit.
    let max = max_text_len.min(u32::MAX as usize);
    if len > max {
        return Err(EncodeError::PayloadTooLarge { len, max });
    }
    Ok(())
}

// `out` is exactly `serialized_size(message)` bytes long, so the writes
// below cannot run out of room.
fn write_fields(message: &Message, out: &mut [u8]) -> Result<(), EncodeError> {
    let needed = out.len();
    let overflow = |_: std::io::Error| EncodeError::BufferTooSmall {
        needed,
        available: needed,
    };

    let mut cursor = Cursor::new(out);
    cursor
        .write_u32::<LittleEndian>(message.text.len() as u32)
        .map_err(overflow)?;
    cursor.write_all(message.text.as_bytes()).map_err(overflow)?;
    cursor
        .write_i64::<LittleEndian>(message.timestamp)
        .map_err(overflow)?;
    Ok(())
}
