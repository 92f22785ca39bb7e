use std::sync::Arc;
use std::time::Duration;

use super::lifecycle::{open_chain, Mode};
use super::{Publisher, Subscriber};
use crate::config::ChannelConfig;
use crate::error::OpenError;
use crate::Core::{loopback, Transport};
use crate::Wire::WireFormat;

pub struct ChannelBuilder {
    channel_name: String,
    config: ChannelConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            channel_name: "hello_topic".to_string(), // Default topic name
            config: ChannelConfig::default(),
            transport: None, // Falls back to the shared loopback transport
        }
    }
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_domain_id(mut self, domain_id: u32) -> Self {
        self.config.domain_id = domain_id;
        self
    }

    pub fn with_participant_name(mut self, name: impl Into<String>) -> Self {
        self.config.participant_name = name.into();
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.config.history_depth = depth.max(1);
        self
    }

    pub fn with_max_payload_size(mut self, size: usize) -> Self {
        self.config.max_payload_size = size;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.config.wire_format = format;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn transport(&self) -> Arc<dyn Transport> {
        if let Some(t) = &self.transport {
            return Arc::clone(t);
        }
        let shared: Arc<dyn Transport> = loopback::shared();
        shared
    }

    pub fn build_publisher(self) -> Result<Publisher, OpenError> {
        let chain = open_chain(self.transport(), &self.channel_name, Mode::Publish, &self.config)?;
        Ok(Publisher::new(
            chain,
            self.config.wire_format,
            self.config.max_payload_size,
        ))
    }

    pub fn build_subscriber(self) -> Result<Subscriber, OpenError> {
        let chain = open_chain(
            self.transport(),
            &self.channel_name,
            Mode::Subscribe,
            &self.config,
        )?;
        Ok(Subscriber::new(
            chain,
            self.config.wire_format,
            self.config.receive_timeout,
        ))
    }
}

/// Open a publisher on `channel_name` with default settings.
pub fn open_publisher(channel_name: &str) -> Result<Publisher, OpenError> {
    ChannelBuilder::new()
        .with_channel_name(channel_name)
        .build_publisher()
}

/// Open a subscriber on `channel_name` with default settings.
pub fn open_subscriber(channel_name: &str) -> Result<Subscriber, OpenError> {
    ChannelBuilder::new()
        .with_channel_name(channel_name)
        .build_subscriber()
}
