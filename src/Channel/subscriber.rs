use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use super::lifecycle::{ResourceChain, Stage};
use crate::error::ReceiveError;
use crate::Core::{Sample, SampleInfo};
use crate::Wire::{Message, WireFormat};

/// The subscribing side of a channel.
pub struct Subscriber {
    pub(crate) chain: Option<ResourceChain>,
    channel_name: String,
    wire_format: WireFormat,
    receive_timeout: Duration,
    messages_received: AtomicU64,
    corrupt_samples: AtomicU64,
}

impl Subscriber {
    pub(crate) fn new(
        chain: ResourceChain,
        wire_format: WireFormat,
        receive_timeout: Duration,
    ) -> Self {
        Self {
            channel_name: chain.channel_name.clone(),
            chain: Some(chain),
            wire_format,
            receive_timeout,
            messages_received: AtomicU64::new(0),
            corrupt_samples: AtomicU64::new(0),
        }
    }

    /// Takes the next available message, waiting up to `timeout` for one.
    ///
    /// A zero timeout polls once. A non-zero timeout spins briefly, then parks
    /// on the transport until a sample arrives or the deadline passes.
    ///
    /// # Returns
    /// * `Ok(Some(message))` if a sample was taken and decoded
    /// * `Ok(None)` if nothing arrived in time (the normal empty case)
    /// * `Err(ReceiveError::CorruptPayload)` if the sample failed to decode; it is consumed
    /// * `Err(ReceiveError::Transport)` if the transport read failed
    pub fn try_receive(&self, timeout: Duration) -> Result<Option<Message>, ReceiveError> {
        self.try_receive_with_info(timeout)
            .map(|opt| opt.map(|(message, _)| message))
    }

    /// `try_receive` using the configured default timeout.
    pub fn receive(&self) -> Result<Option<Message>, ReceiveError> {
        self.try_receive(self.receive_timeout)
    }

    /// Like `try_receive`, also returning the sample's delivery metadata.
    pub fn try_receive_with_info(
        &self,
        timeout: Duration,
    ) -> Result<Option<(Message, SampleInfo)>, ReceiveError> {
        let chain = self.chain.as_ref().ok_or(ReceiveError::Closed)?;
        let start = Instant::now();
        let backoff = Backoff::new();

        loop {
            match chain.transport.read_next(chain.endpoint) {
                Ok(Some(sample)) => return self.decode_sample(sample).map(Some),
                Ok(None) => {}
                Err(e) => return Err(ReceiveError::Transport(e)),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }

            if backoff.is_completed() {
                chain
                    .transport
                    .wait_for_sample(chain.endpoint, timeout - elapsed);
            } else {
                backoff.snooze();
            }
        }
    }

    fn decode_sample(&self, sample: Sample) -> Result<(Message, SampleInfo), ReceiveError> {
        match self.wire_format.decode(&sample.payload) {
            Ok(message) => {
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                Ok((message, sample.info))
            }
            Err(error) => {
                self.corrupt_samples.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    channel = %self.channel_name,
                    writer = %sample.info.writer,
                    bytes = sample.payload.len(),
                    %error,
                    "dropping corrupt sample"
                );
                Err(ReceiveError::CorruptPayload(error))
            }
        }
    }

    /// Release the resource chain. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut chain) = self.chain.take() {
            chain.teardown();
            tracing::info!(
                channel = %self.channel_name,
                received = self.messages_received(),
                corrupt = self.corrupt_samples(),
                "subscriber closed"
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

    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn corrupt_samples(&self) -> u64 {
        self.corrupt_samples.load(Ordering::Relaxed)
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.close();
    }
}
