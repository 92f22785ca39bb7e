// Error taxonomy for the codec, the transport seam and the channel lifecycle.

use std::str::Utf8Error;

use thiserror::Error;

use crate::Wire::WireFormat;

/// Failure to shape a message into a wire buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("payload too large ({len} > {max} bytes)")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("wire buffer too small ({needed} bytes needed, {available} available)")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("text contains a NUL byte at offset {offset}")]
    InteriorNul { offset: usize },
}

/// Failure to rebuild a message from a wire buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed buffer: {len} bytes is shorter than the {min}-byte header")]
    Malformed { len: usize, min: usize },

    #[error("truncated buffer: length prefix declares {declared} text bytes, only {available} fit")]
    Truncated { declared: usize, available: usize },

    #[error("message text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
}

/// Which acquisition step a transport call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Participant,
    TypeRegistration,
    Topic,
    Group,
    Endpoint,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Participant => "participant",
            Step::TypeRegistration => "type registration",
            Step::Topic => "topic",
            Step::Group => "group",
            Step::Endpoint => "endpoint",
        };
        f.write_str(name)
    }
}

/// Errors reported by a `Transport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    #[error("payload shape {name:?} conflicts with an existing registration")]
    ShapeMismatch { name: String },

    #[error("{kind} {id} still owns live resources")]
    StillInUse { kind: &'static str, id: u64 },

    #[error("transport rejected the operation: {0}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("injected {0} fault")]
    Injected(Step),
}

/// Failure to open a publisher or subscriber. Carries the failed step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    #[error("invalid channel name {0:?}")]
    InvalidChannelName(String),

    #[error("{format} frames do not fit the transport's {max_payload}-byte payload limit")]
    FrameExceedsTransport { format: WireFormat, max_payload: usize },

    #[error("participant creation failed: {0}")]
    ParticipantCreationFailed(#[source] TransportError),

    #[error("type registration failed: {0}")]
    TypeRegistrationFailed(#[source] TransportError),

    #[error("topic creation failed: {0}")]
    TopicCreationFailed(#[source] TransportError),

    #[error("group creation failed: {0}")]
    GroupCreationFailed(#[source] TransportError),

    #[error("endpoint creation failed: {0}")]
    EndpointCreationFailed(#[source] TransportError),
}

impl OpenError {
    pub(crate) fn at(step: Step, source: TransportError) -> Self {
        match step {
            Step::Participant => OpenError::ParticipantCreationFailed(source),
            Step::TypeRegistration => OpenError::TypeRegistrationFailed(source),
            Step::Topic => OpenError::TopicCreationFailed(source),
            Step::Group => OpenError::GroupCreationFailed(source),
            Step::Endpoint => OpenError::EndpointCreationFailed(source),
        }
    }

    /// The acquisition step that failed, if the failure came from the transport.
    pub fn step(&self) -> Option<Step> {
        match self {
            OpenError::InvalidChannelName(_) | OpenError::FrameExceedsTransport { .. } => None,
            OpenError::ParticipantCreationFailed(_) => Some(Step::Participant),
            OpenError::TypeRegistrationFailed(_) => Some(Step::TypeRegistration),
            OpenError::TopicCreationFailed(_) => Some(Step::Topic),
            OpenError::GroupCreationFailed(_) => Some(Step::Group),
            OpenError::EndpointCreationFailed(_) => Some(Step::Endpoint),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("transport rejected write: {0}")]
    TransportRejected(#[source] TransportError),

    #[error("publisher is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiveError {
    #[error("corrupt payload: {0}")]
    CorruptPayload(#[from] DecodeError),

    #[error("transport read failed: {0}")]
    Transport(#[source] TransportError),

    #[error("subscriber is closed")]
    Closed,
}

/// Errors surfaced through the id-keyed host registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no open handle with id {0}")]
    UnknownHandle(u64),

    #[error("handle {id} is not a {expected}")]
    WrongMode { id: u64, expected: &'static str },

    #[error("next message needs a {needed}-byte buffer")]
    BufferTooSmall { needed: usize },

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),
}
