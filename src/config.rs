use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::Core::ContainerConfig;
use crate::Wire::codec::MAX_PAYLOAD_SIZE;
use crate::Wire::WireFormat;

/// Settings shared by every channel a builder or host registry opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub domain_id: u32,
    pub participant_name: String,
    /// Samples a subscriber keeps before the oldest is dropped.
    pub history_depth: usize,
    /// Largest message text accepted by `send`.
    pub max_payload_size: usize,
    /// Default wait used by `Subscriber::receive`.
    pub receive_timeout: Duration,
    pub wire_format: WireFormat,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            participant_name: "Cardinal_Participant".to_string(),
            history_depth: 100,
            max_payload_size: MAX_PAYLOAD_SIZE,
            receive_timeout: Duration::ZERO,
            wire_format: WireFormat::LengthPrefixed,
        }
    }
}

impl ChannelConfig {
    /// Defaults with `CARDINAL_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overrides fields from the environment. Unparsable values are logged and
    /// the current value is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("CARDINAL_DOMAIN_ID") {
            self.domain_id = v;
        }
        if let Ok(v) = env::var("CARDINAL_PARTICIPANT_NAME") {
            if !v.is_empty() {
                self.participant_name = v;
            }
        }
        if let Some(v) = env_parse::<usize>("CARDINAL_HISTORY_DEPTH") {
            self.history_depth = v.max(1);
        }
        if let Some(v) = env_parse::<usize>("CARDINAL_MAX_PAYLOAD") {
            self.max_payload_size = v;
        }
        if let Some(v) = env_parse::<u64>("CARDINAL_RECEIVE_TIMEOUT_MS") {
            self.receive_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_parse::<WireFormat>("CARDINAL_WIRE_FORMAT") {
            self.wire_format = v;
        }
    }

    pub fn container_config(&self) -> ContainerConfig {
        ContainerConfig {
            domain_id: self.domain_id,
            participant_name: self.participant_name.clone(),
            history_depth: self.history_depth,
        }
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(
                key,
                value = %raw,
                error = %e,
                "ignoring invalid configuration override"
            );
            None
        }
    }
}
