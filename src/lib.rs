// Module naming follows project convention (Wire = on-the-wire encoding, Core = transport plumbing)
#[allow(non_snake_case)]
pub mod Wire {
    pub mod codec;
    pub mod fixed;
    pub mod format;
    pub mod message;
    pub use format::WireFormat; // re-export for stable path
    pub use message::Message;
}
#[allow(non_snake_case)]
pub mod Core {
    pub mod faults;
    pub mod futex;
    pub mod journal;
    pub mod loopback;
    pub mod shape;
    pub mod transport;
    pub use faults::FaultPlan;
    pub use journal::{ResourceEvent, ResourceKind};
    pub use loopback::LoopbackTransport;
    pub use shape::ShapeDescriptor;
    pub use transport::{
        ChannelResource, ContainerConfig, ContainerHandle, EndpointHandle, GroupHandle, Role,
        Sample, SampleInfo, Transport,
    };
}
#[allow(non_snake_case)]
pub mod Channel {
    pub mod builder;
    mod debug;
    pub mod lifecycle;
    mod publisher;
    mod subscriber;
    pub use builder::{open_publisher, open_subscriber, ChannelBuilder};
    pub use lifecycle::{Mode, Stage};
    pub use publisher::Publisher;
    pub use subscriber::Subscriber;
}
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub mod config;
pub mod error;
pub mod ffi;
pub mod host;
pub mod logging;

pub use config::ChannelConfig;
pub use error::{DecodeError, EncodeError, HostError, OpenError, ReceiveError, SendError, Step};
pub use Channel::{ChannelBuilder, Publisher, Subscriber};
pub use Wire::{Message, WireFormat};
