// Resource lifecycle for one publish or subscribe endpoint.
//
// Acquisition order is fixed:
//
//   Unopened -> ParticipantAcquired -> TypeRegistered -> TopicCreated
//            -> GroupCreated -> EndpointCreated -> Ready
//
// Each acquired resource is pushed on a cleanup stack. A failed step pops the
// stack (endpoint first, container last) before the error is returned, and
// `close` drains the same stack, so a container is never released while
// something it owns is still live.

use std::fmt;
use std::sync::Arc;

use crate::config::ChannelConfig;
use crate::error::{OpenError, Step, TransportError};
use crate::Wire::WireFormat;
use crate::Core::{
    ChannelResource, ContainerHandle, EndpointHandle, GroupHandle, Role, ShapeDescriptor, Transport,
};

/// Progress of one open attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Unopened,
    ParticipantAcquired,
    TypeRegistered,
    TopicCreated,
    GroupCreated,
    EndpointCreated,
    Ready,
}

impl Stage {
    /// Stage reached once `step` succeeds.
    fn after(step: Step) -> Stage {
        match step {
            Step::Participant => Stage::ParticipantAcquired,
            Step::TypeRegistration => Stage::TypeRegistered,
            Step::Topic => Stage::TopicCreated,
            Step::Group => Stage::GroupCreated,
            Step::Endpoint => Stage::EndpointCreated,
        }
    }
}

/// Whether a handle writes or reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Publish,
    Subscribe,
}

impl Mode {
    pub fn role(self) -> Role {
        match self {
            Mode::Publish => Role::Pub,
            Mode::Subscribe => Role::Sub,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Publish => f.write_str("publish"),
            Mode::Subscribe => f.write_str("subscribe"),
        }
    }
}

/// An entry on the cleanup stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquired {
    Container(ContainerHandle),
    Channel(ChannelResource),
    Group(GroupHandle),
    Endpoint(EndpointHandle),
}

/// Best-effort release of one resource. Failures are logged, never returned,
/// so a stuck resource does not block its siblings.
fn release(transport: &dyn Transport, resource: Acquired, channel: &str) {
    let result = match resource {
        Acquired::Endpoint(h) => transport.destroy_endpoint(h),
        Acquired::Group(h) => transport.destroy_group(h),
        Acquired::Channel(h) => transport.destroy_channel(h),
        Acquired::Container(h) => transport.destroy_container(h),
    };
    match result {
        Ok(()) => tracing::debug!(channel, ?resource, "released"),
        Err(error) => {
            tracing::warn!(channel, ?resource, %error, "release failed; continuing teardown")
        }
    }
}

fn drain(transport: &dyn Transport, stack: &mut Vec<Acquired>, channel: &str) {
    while let Some(resource) = stack.pop() {
        release(transport, resource, channel);
    }
}

/// A fully built resource chain. Only exists in the `Ready` stage.
pub(crate) struct ResourceChain {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) mode: Mode,
    pub(crate) channel_name: String,
    pub(crate) container: ContainerHandle,
    pub(crate) channel: ChannelResource,
    pub(crate) group: GroupHandle,
    pub(crate) endpoint: EndpointHandle,
    cleanup: Vec<Acquired>,
}

impl ResourceChain {
    /// Release everything in reverse acquisition order. Idempotent.
    pub(crate) fn teardown(&mut self) {
        if self.cleanup.is_empty() {
            return;
        }
        tracing::debug!(channel = %self.channel_name, mode = %self.mode, "tearing down");
        drain(&*self.transport, &mut self.cleanup, &self.channel_name);
    }

    pub(crate) fn is_released(&self) -> bool {
        self.cleanup.is_empty()
    }
}

/// One in-flight open. Owns the cleanup stack until `finish` hands it over.
struct OpenAttempt<'a> {
    transport: &'a dyn Transport,
    channel_name: &'a str,
    mode: Mode,
    stage: Stage,
    cleanup: Vec<Acquired>,
}

impl<'a> OpenAttempt<'a> {
    fn new(transport: &'a dyn Transport, channel_name: &'a str, mode: Mode) -> Self {
        Self {
            transport,
            channel_name,
            mode,
            stage: Stage::Unopened,
            cleanup: Vec::with_capacity(4),
        }
    }

    /// Run one acquisition step. On success the stage advances and the
    /// resource (if any) is pushed for cleanup; on failure everything acquired
    /// so far is released before the error is returned.
    fn step<T>(
        &mut self,
        step: Step,
        acquire: impl FnOnce(&dyn Transport) -> Result<T, TransportError>,
        track: impl FnOnce(&T) -> Option<Acquired>,
    ) -> Result<T, OpenError> {
        match acquire(self.transport) {
            Ok(value) => {
                if let Some(resource) = track(&value) {
                    self.cleanup.push(resource);
                }
                self.stage = Stage::after(step);
                tracing::debug!(
                    channel = self.channel_name,
                    mode = %self.mode,
                    stage = ?self.stage,
                    "lifecycle step complete"
                );
                Ok(value)
            }
            Err(source) => {
                tracing::error!(
                    channel = self.channel_name,
                    mode = %self.mode,
                    reached = ?self.stage,
                    %step,
                    error = %source,
                    "open failed; unwinding"
                );
                self.unwind();
                Err(OpenError::at(step, source))
            }
        }
    }

    fn unwind(&mut self) {
        drain(self.transport, &mut self.cleanup, self.channel_name);
        self.stage = Stage::Unopened;
    }

    fn finish(mut self) -> Vec<Acquired> {
        self.stage = Stage::Ready;
        std::mem::take(&mut self.cleanup)
    }
}

impl Drop for OpenAttempt<'_> {
    // Covers a panic inside a transport call between steps.
    fn drop(&mut self) {
        if !self.cleanup.is_empty() {
            self.unwind();
        }
    }
}

/// Reject names the transport could not carry across a C boundary.
pub(crate) fn validate_channel_name(name: &str) -> Result<(), OpenError> {
    if name.is_empty() || name.contains('\0') {
        return Err(OpenError::InvalidChannelName(name.to_string()));
    }
    Ok(())
}

/// Reject a wire format whose smallest frame the transport cannot carry.
fn check_frame_fits(transport: &dyn Transport, format: WireFormat) -> Result<(), OpenError> {
    let max_payload = transport.max_payload_size();
    if format.text_capacity(max_payload).is_none() {
        return Err(OpenError::FrameExceedsTransport { format, max_payload });
    }
    Ok(())
}

/// Walk the acquisition sequence for `mode` on `channel_name`.
///
/// Returns a chain in the `Ready` stage, or the failed step with every
/// partially acquired resource already released.
pub(crate) fn open_chain(
    transport: Arc<dyn Transport>,
    channel_name: &str,
    mode: Mode,
    config: &ChannelConfig,
) -> Result<ResourceChain, OpenError> {
    validate_channel_name(channel_name)?;
    check_frame_fits(&*transport, config.wire_format)?;

    let shape = ShapeDescriptor::for_format(config.wire_format);
    let container_config = config.container_config();

    let (container, channel, group, endpoint, cleanup) = {
        let mut attempt = OpenAttempt::new(&*transport, channel_name, mode);

        let container = attempt.step(
            Step::Participant,
            |t| t.create_container(&container_config),
            |c| Some(Acquired::Container(*c)),
        )?;
        attempt.step(
            Step::TypeRegistration,
            |t| t.register_payload_shape(container, &shape),
            |_| None,
        )?;
        let channel = attempt.step(
            Step::Topic,
            |t| t.create_named_channel(container, channel_name, &shape),
            |c| Some(Acquired::Channel(*c)),
        )?;
        let group = attempt.step(
            Step::Group,
            |t| t.create_group(container, mode.role()),
            |g| Some(Acquired::Group(*g)),
        )?;
        let endpoint = attempt.step(
            Step::Endpoint,
            |t| t.create_endpoint(group, channel),
            |e| Some(Acquired::Endpoint(*e)),
        )?;

        (container, channel, group, endpoint, attempt.finish())
    };

    tracing::info!(
        channel = channel_name,
        %mode,
        domain = config.domain_id,
        %endpoint,
        "channel ready"
    );

    Ok(ResourceChain {
        transport,
        mode,
        channel_name: channel_name.to_string(),
        container,
        channel,
        group,
        endpoint,
        cleanup,
    })
}
