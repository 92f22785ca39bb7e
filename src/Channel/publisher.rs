use std::sync::atomic::{AtomicU64, Ordering};

use super::lifecycle::{ResourceChain, Stage};
use crate::error::SendError;
use crate::Wire::{Message, WireFormat};

/// The publishing side of a channel.
///
/// Holds a `Ready` resource chain until `close` (or drop) releases it.
/// Operations on a closed publisher fail fast with `SendError::Closed`.
pub struct Publisher {
    pub(crate) chain: Option<ResourceChain>,
    channel_name: String,
    wire_format: WireFormat,
    max_text_len: usize,
    messages_sent: AtomicU64,
}

impl Publisher {
    pub(crate) fn new(
        chain: ResourceChain,
        wire_format: WireFormat,
        max_payload_size: usize,
    ) -> Self {
        // The transport limit covers the whole frame, header included.
        let wire_limit = wire_format
            .text_capacity(chain.transport.max_payload_size())
            .unwrap_or(0);
        let max_text_len = wire_format.max_text_len(max_payload_size.min(wire_limit));

        Self {
            channel_name: chain.channel_name.clone(),
            chain: Some(chain),
            wire_format,
            max_text_len,
            messages_sent: AtomicU64::new(0),
        }
    }

    /// Encodes `message` and hands it to the transport writer.
    ///
    /// # Returns
    /// * `Ok(())` once the transport accepted the buffer (not a delivery receipt)
    /// * `Err(SendError::Encode)` if the text exceeds the payload limit
    /// * `Err(SendError::TransportRejected)` if the write was refused
    /// * `Err(SendError::Closed)` after `close`
    pub fn send(&self, message: &Message) -> Result<(), SendError> {
        let chain = self.chain.as_ref().ok_or(SendError::Closed)?;

        let buffer = self.wire_format.encode(message, self.max_text_len)?;
        chain
            .transport
            .write(chain.endpoint, &buffer)
            .map_err(SendError::TransportRejected)?;

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            channel = %self.channel_name,
            bytes = buffer.len(),
            timestamp = message.timestamp,
            "message sent"
        );
        Ok(())
    }

    pub fn send_text(&self, text: &str, timestamp: i64) -> Result<(), SendError> {
        self.send(&Message::new(text, timestamp))
    }

    /// Release the resource chain. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut chain) = self.chain.take() {
            chain.teardown();
            tracing::info!(
                channel = %self.channel_name,
                sent = self.messages_sent(),
                "publisher closed"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.chain.as_ref().is_some_and(|c| !c.is_released())
    }

    pub fn stage(&self) -> Stage {
        if self.is_open() {
            Stage::Ready
        } else {
            Stage::Unopened
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    /// Largest text `send` accepts.
    pub fn max_text_len(&self) -> usize {
        self.max_text_len
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.close();
    }
}
