// The narrow interface the channel lifecycle consumes from a DDS-style
// transport: participant -> topic / group -> writer / reader.

use std::fmt;
use std::time::Duration;

use super::shape::ShapeDescriptor;
use crate::error::TransportError;

macro_rules! resource_handle {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn id(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

resource_handle!(
    /// Top-level participant; owns every other resource.
    ContainerHandle,
    "container"
);
resource_handle!(
    /// A named topic bound to one payload shape.
    ChannelResource,
    "channel"
);
resource_handle!(
    /// Publisher or subscriber group.
    GroupHandle,
    "group"
);
resource_handle!(
    /// Writer or reader bound to one channel.
    EndpointHandle,
    "endpoint"
);

/// Which side of a channel a group serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Pub,
    Sub,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Pub => f.write_str("publisher"),
            Role::Sub => f.write_str("subscriber"),
        }
    }
}

/// Participant-wide settings handed to `create_container`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    pub domain_id: u32,
    pub participant_name: String,
    /// Samples each reader retains before the oldest is dropped.
    pub history_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            participant_name: "Cardinal_Participant".to_string(),
            history_depth: 100,
        }
    }
}

/// Delivery metadata paired with each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub writer: EndpointHandle,
    /// Per-writer sequence number, starting at 1.
    pub sequence: u64,
    /// Nanoseconds since the UNIX epoch at write time.
    pub source_timestamp_ns: u64,
}

/// One message instance as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub payload: Vec<u8>,
    pub info: SampleInfo,
}

/// Capabilities a data-distribution transport must provide.
///
/// Implementations own the lifetime of every resource; the caller only holds
/// handles and is responsible for destroying them child-first.
pub trait Transport: Send + Sync {
    fn create_container(&self, config: &ContainerConfig) -> Result<ContainerHandle, TransportError>;

    fn register_payload_shape(
        &self,
        container: ContainerHandle,
        shape: &ShapeDescriptor,
    ) -> Result<(), TransportError>;

    fn create_named_channel(
        &self,
        container: ContainerHandle,
        name: &str,
        shape: &ShapeDescriptor,
    ) -> Result<ChannelResource, TransportError>;

    fn create_group(
        &self,
        container: ContainerHandle,
        role: Role,
    ) -> Result<GroupHandle, TransportError>;

    fn create_endpoint(
        &self,
        group: GroupHandle,
        channel: ChannelResource,
    ) -> Result<EndpointHandle, TransportError>;

    /// Hand one encoded buffer to a writer. Success means local acceptance only.
    fn write(&self, endpoint: EndpointHandle, buffer: &[u8]) -> Result<(), TransportError>;

    /// Take the next available sample, if any. Never blocks.
    fn read_next(&self, endpoint: EndpointHandle) -> Result<Option<Sample>, TransportError>;

    fn destroy_endpoint(&self, endpoint: EndpointHandle) -> Result<(), TransportError>;

    fn destroy_channel(&self, channel: ChannelResource) -> Result<(), TransportError>;

    fn destroy_group(&self, group: GroupHandle) -> Result<(), TransportError>;

    fn destroy_container(&self, container: ContainerHandle) -> Result<(), TransportError>;

    /// Largest serialized payload `write` accepts.
    fn max_payload_size(&self) -> usize {
        crate::Wire::codec::MAX_PAYLOAD_SIZE
    }

    /// Park the caller until a sample may be available on `endpoint` or
    /// `timeout` elapses. Spurious returns are allowed.
    fn wait_for_sample(&self, _endpoint: EndpointHandle, timeout: Duration) {
        std::thread::sleep(timeout.min(Duration::from_millis(10)));
    }
}
