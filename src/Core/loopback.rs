// In-process transport. Every participant created through one
// `LoopbackTransport` shares its domain tables, so a writer and a reader on the
// same domain, topic name and payload shape see each other immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use parking_lot::Mutex;

use super::faults::FaultPlan;
use super::futex::{futex_wait_timeout, futex_wake_all};
use super::journal::{Journal, ResourceEvent, ResourceKind};
use super::shape::ShapeDescriptor;
use super::transport::{
    ChannelResource, ContainerConfig, ContainerHandle, EndpointHandle, GroupHandle, Role, Sample,
    SampleInfo, Transport,
};
use crate::error::{Step, TransportError};
use crate::Wire::codec::MAX_PAYLOAD_SIZE;

lazy_static! {
    static ref SHARED: Arc<LoopbackTransport> = Arc::new(LoopbackTransport::new());
}

/// The process-wide loopback transport used when no other is configured.
pub fn shared() -> Arc<LoopbackTransport> {
    Arc::clone(&SHARED)
}

pub(crate) struct ContainerEntry {
    pub(crate) domain_id: u32,
    pub(crate) name: String,
    history_depth: usize,
    shapes: HashMap<String, [u8; 32]>,
}

pub(crate) struct ChannelEntry {
    container: u64,
    domain_id: u32,
    name: String,
    fingerprint: [u8; 32],
}

struct GroupEntry {
    container: u64,
    role: Role,
}

enum EndpointState {
    Writer {
        next_sequence: u64,
    },
    Reader {
        queue: VecDeque<Sample>,
        depth: usize,
        signal: Arc<AtomicU32>,
    },
}

struct EndpointEntry {
    group: u64,
    channel: u64,
    state: EndpointState,
}

#[derive(Default)]
pub(crate) struct DomainTables {
    next_id: u64,
    pub(crate) containers: HashMap<u64, ContainerEntry>,
    pub(crate) channels: HashMap<u64, ChannelEntry>,
    groups: HashMap<u64, GroupEntry>,
    endpoints: HashMap<u64, EndpointEntry>,
    journal: Journal,
    faults: FaultPlan,
}

impl DomainTables {
    fn allocate(&mut self, kind: ResourceKind) -> u64 {
        self.next_id += 1;
        self.journal.record(ResourceEvent::Created(kind, self.next_id));
        self.next_id
    }

    fn check_fault(&self, step: Step) -> Result<(), TransportError> {
        if self.faults.fails(step) {
            return Err(TransportError::Injected(step));
        }
        Ok(())
    }

    fn check_destroy_fault(&self, kind: ResourceKind) -> Result<(), TransportError> {
        if self.faults.fails_destroy(kind) {
            return Err(TransportError::Rejected(format!(
                "{kind} destroy disabled by fault plan"
            )));
        }
        Ok(())
    }

    pub(crate) fn live_count(&self) -> usize {
        self.containers.len() + self.channels.len() + self.groups.len() + self.endpoints.len()
    }

    /// Push `payload` to every live reader matching `(domain, topic, fingerprint)`.
    /// Returns the signal words to wake once the lock is released.
    fn fan_out(
        &mut self,
        domain_id: u32,
        topic: &str,
        fingerprint: &[u8; 32],
        payload: &[u8],
        info: SampleInfo,
    ) -> Vec<Arc<AtomicU32>> {
        let channels = &self.channels;
        let mut woken = Vec::new();

        for endpoint in self.endpoints.values_mut() {
            let Some(channel) = channels.get(&endpoint.channel) else {
                continue;
            };
            if channel.domain_id != domain_id
                || channel.name != topic
                || &channel.fingerprint != fingerprint
            {
                continue;
            }
            if let EndpointState::Reader { queue, depth, signal } = &mut endpoint.state {
                queue.push_back(Sample {
                    payload: payload.to_vec(),
                    info,
                });
                while queue.len() > *depth {
                    queue.pop_front();
                }
                signal.fetch_add(1, Ordering::Release);
                woken.push(Arc::clone(signal));
            }
        }
        woken
    }
}

/// An in-process `Transport` with an optional resource journal and fault injection.
pub struct LoopbackTransport {
    pub(crate) tables: Mutex<DomainTables>,
    max_payload: usize,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE + crate::Wire::codec::MIN_ENCODED_LEN)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            tables: Mutex::new(DomainTables::default()),
            max_payload,
        }
    }

    /// Make `step` fail on every attempt until `clear_faults`.
    pub fn fail_step(&self, step: Step) {
        self.tables.lock().faults.failing_steps.insert(step);
    }

    pub fn fail_destroy(&self, kind: ResourceKind) {
        self.tables.lock().faults.failing_destroys.insert(kind);
    }

    pub fn reject_writes(&self, reject: bool) {
        self.tables.lock().faults.reject_writes = reject;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.tables.lock().faults.fail_reads = fail;
    }

    pub fn set_faults(&self, plan: FaultPlan) {
        self.tables.lock().faults = plan;
    }

    pub fn clear_faults(&self) {
        self.tables.lock().faults = FaultPlan::default();
    }

    /// Keep the last `capacity` create / destroy events for `journal`.
    /// Recording is off by default.
    pub fn with_journal(mut self, capacity: usize) -> Self {
        self.tables.get_mut().journal.set_capacity(capacity);
        self
    }

    /// Recorded events since the last `clear_journal`, oldest first.
    pub fn journal(&self) -> Vec<ResourceEvent> {
        self.tables.lock().journal.snapshot()
    }

    pub fn clear_journal(&self) {
        self.tables.lock().journal.clear();
    }

    /// Number of containers, channels, groups and endpoints still alive.
    pub fn live_resources(&self) -> usize {
        self.tables.lock().live_count()
    }

    /// Deliver raw bytes to every reader of `topic` in `domain_id`, bypassing
    /// any writer. The sample is attributed to writer `endpoint#0`.
    pub fn inject(
        &self,
        domain_id: u32,
        topic: &str,
        shape: &ShapeDescriptor,
        payload: &[u8],
    ) -> usize {
        let info = SampleInfo {
            writer: EndpointHandle(0),
            sequence: 0,
            source_timestamp_ns: now_ns(),
        };
        let woken = self
            .tables
            .lock()
            .fan_out(domain_id, topic, &shape.fingerprint(), payload, info);
        for signal in &woken {
            futex_wake_all(signal);
        }
        woken.len()
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

fn unknown(kind: &'static str, id: u64) -> TransportError {
    TransportError::UnknownHandle { kind, id }
}

impl Transport for LoopbackTransport {
    fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerHandle, TransportError> {
        let mut tables = self.tables.lock();
        tables.check_fault(Step::Participant)?;

        let id = tables.allocate(ResourceKind::Container);
        tables.containers.insert(
            id,
            ContainerEntry {
                domain_id: config.domain_id,
                name: config.participant_name.clone(),
                history_depth: config.history_depth.max(1),
                shapes: HashMap::new(),
            },
        );
        tracing::trace!(container = id, domain = config.domain_id, "loopback participant created");
        Ok(ContainerHandle(id))
    }

    fn register_payload_shape(
        &self,
        container: ContainerHandle,
        shape: &ShapeDescriptor,
    ) -> Result<(), TransportError> {
        let mut tables = self.tables.lock();
        tables.check_fault(Step::TypeRegistration)?;

        let fingerprint = shape.fingerprint();
        let entry = tables
            .containers
            .get_mut(&container.0)
            .ok_or_else(|| unknown(ContainerHandle::KIND, container.0))?;

        match entry.shapes.get(&shape.type_name) {
            Some(existing) if *existing != fingerprint => {
                return Err(TransportError::ShapeMismatch {
                    name: shape.type_name.clone(),
                });
            }
            Some(_) => return Ok(()),
            None => {
                entry.shapes.insert(shape.type_name.clone(), fingerprint);
            }
        }

        tables.journal.record(ResourceEvent::ShapeRegistered {
            container: container.0,
            type_name: shape.type_name.clone(),
        });
        Ok(())
    }

    fn create_named_channel(
        &self,
        container: ContainerHandle,
        name: &str,
        shape: &ShapeDescriptor,
    ) -> Result<ChannelResource, TransportError> {
        let mut tables = self.tables.lock();
        tables.check_fault(Step::Topic)?;

        let fingerprint = shape.fingerprint();
        let entry = tables
            .containers
            .get(&container.0)
            .ok_or_else(|| unknown(ContainerHandle::KIND, container.0))?;
        if entry.shapes.get(&shape.type_name) != Some(&fingerprint) {
            return Err(TransportError::Rejected(format!(
                "type {:?} is not registered on {container}",
                shape.type_name
            )));
        }
        let domain_id = entry.domain_id;

        // A topic name is bound to one shape per domain.
        let conflict = tables.channels.values().any(|ch| {
            ch.domain_id == domain_id && ch.name == name && ch.fingerprint != fingerprint
        });
        if conflict {
            return Err(TransportError::ShapeMismatch {
                name: shape.type_name.clone(),
            });
        }

        let id = tables.allocate(ResourceKind::Channel);
        tables.channels.insert(
            id,
            ChannelEntry {
                container: container.0,
                domain_id,
                name: name.to_string(),
                fingerprint,
            },
        );
        tracing::trace!(channel = id, topic = name, "loopback topic created");
        Ok(ChannelResource(id))
    }

    fn create_group(
        &self,
        container: ContainerHandle,
        role: Role,
    ) -> Result<GroupHandle, TransportError> {
        let mut tables = self.tables.lock();
        tables.check_fault(Step::Group)?;

        if !tables.containers.contains_key(&container.0) {
            return Err(unknown(ContainerHandle::KIND, container.0));
        }

        let id = tables.allocate(ResourceKind::Group);
        tables.groups.insert(
            id,
            GroupEntry {
                container: container.0,
                role,
            },
        );
        Ok(GroupHandle(id))
    }

    fn create_endpoint(
        &self,
        group: GroupHandle,
        channel: ChannelResource,
    ) -> Result<EndpointHandle, TransportError> {
        let mut tables = self.tables.lock();
        tables.check_fault(Step::Endpoint)?;

        let group_entry = tables
            .groups
            .get(&group.0)
            .ok_or_else(|| unknown(GroupHandle::KIND, group.0))?;
        let channel_entry = tables
            .channels
            .get(&channel.0)
            .ok_or_else(|| unknown(ChannelResource::KIND, channel.0))?;
        if group_entry.container != channel_entry.container {
            return Err(TransportError::Rejected(format!(
                "{group} and {channel} belong to different participants"
            )));
        }

        let role = group_entry.role;
        let depth = tables
            .containers
            .get(&group_entry.container)
            .map(|c| c.history_depth)
            .unwrap_or(1);

        let state = match role {
            Role::Pub => EndpointState::Writer { next_sequence: 1 },
            Role::Sub => EndpointState::Reader {
                queue: VecDeque::new(),
                depth,
                signal: Arc::new(AtomicU32::new(0)),
            },
        };

        let id = tables.allocate(ResourceKind::Endpoint);
        tables.endpoints.insert(
            id,
            EndpointEntry {
                group: group.0,
                channel: channel.0,
                state,
            },
        );
        tracing::trace!(endpoint = id, %role, "loopback endpoint created");
        Ok(EndpointHandle(id))
    }

    fn write(&self, endpoint: EndpointHandle, buffer: &[u8]) -> Result<(), TransportError> {
        if buffer.len() > self.max_payload {
            return Err(TransportError::Rejected(format!(
                "payload of {} bytes exceeds the {}-byte limit",
                buffer.len(),
                self.max_payload
            )));
        }

        let woken = {
            let mut tables = self.tables.lock();
            if tables.faults.reject_writes {
                return Err(TransportError::Rejected("writes disabled by fault plan".to_string()));
            }

            let entry = tables
                .endpoints
                .get_mut(&endpoint.0)
                .ok_or_else(|| unknown(EndpointHandle::KIND, endpoint.0))?;
            let channel_id = entry.channel;
            let sequence = match &mut entry.state {
                EndpointState::Writer { next_sequence } => {
                    let seq = *next_sequence;
                    *next_sequence += 1;
                    seq
                }
                EndpointState::Reader { .. } => {
                    return Err(TransportError::Rejected(format!("{endpoint} is a reader")));
                }
            };

            let (domain_id, topic, fingerprint) = match tables.channels.get(&channel_id) {
                Some(ch) => (ch.domain_id, ch.name.clone(), ch.fingerprint),
                None => return Err(unknown(ChannelResource::KIND, channel_id)),
            };

            let info = SampleInfo {
                writer: endpoint,
                sequence,
                source_timestamp_ns: now_ns(),
            };
            tables.fan_out(domain_id, &topic, &fingerprint, buffer, info)
        };

        for signal in &woken {
            futex_wake_all(signal);
        }
        Ok(())
    }

    fn read_next(&self, endpoint: EndpointHandle) -> Result<Option<Sample>, TransportError> {
        let mut tables = self.tables.lock();
        if tables.faults.fail_reads {
            return Err(TransportError::Unavailable("reads disabled by fault plan".to_string()));
        }

        let entry = tables
            .endpoints
            .get_mut(&endpoint.0)
            .ok_or_else(|| unknown(EndpointHandle::KIND, endpoint.0))?;
        match &mut entry.state {
            EndpointState::Reader { queue, .. } => Ok(queue.pop_front()),
            EndpointState::Writer { .. } => Err(TransportError::Rejected(format!(
                "{endpoint} is a writer"
            ))),
        }
    }

    fn destroy_endpoint(&self, endpoint: EndpointHandle) -> Result<(), TransportError> {
        let removed = {
            let mut tables = self.tables.lock();
            tables.check_destroy_fault(ResourceKind::Endpoint)?;
            let removed = tables
                .endpoints
                .remove(&endpoint.0)
                .ok_or_else(|| unknown(EndpointHandle::KIND, endpoint.0))?;
            tables
                .journal
                .record(ResourceEvent::Destroyed(ResourceKind::Endpoint, endpoint.0));
            removed
        };

        // Release anyone still parked on a reader that just went away.
        if let EndpointState::Reader { signal, .. } = removed.state {
            signal.fetch_add(1, Ordering::Release);
            futex_wake_all(&signal);
        }
        Ok(())
    }

    fn destroy_channel(&self, channel: ChannelResource) -> Result<(), TransportError> {
        let mut tables = self.tables.lock();
        tables.check_destroy_fault(ResourceKind::Channel)?;
        if !tables.channels.contains_key(&channel.0) {
            return Err(unknown(ChannelResource::KIND, channel.0));
        }
        if tables.endpoints.values().any(|e| e.channel == channel.0) {
            return Err(TransportError::StillInUse {
                kind: ChannelResource::KIND,
                id: channel.0,
            });
        }
        tables.channels.remove(&channel.0);
        tables
            .journal
            .record(ResourceEvent::Destroyed(ResourceKind::Channel, channel.0));
        Ok(())
    }

    fn destroy_group(&self, group: GroupHandle) -> Result<(), TransportError> {
        let mut tables = self.tables.lock();
        tables.check_destroy_fault(ResourceKind::Group)?;
        if !tables.groups.contains_key(&group.0) {
            return Err(unknown(GroupHandle::KIND, group.0));
        }
        if tables.endpoints.values().any(|e| e.group == group.0) {
            return Err(TransportError::StillInUse {
                kind: GroupHandle::KIND,
                id: group.0,
            });
        }
        tables.groups.remove(&group.0);
        tables
            .journal
            .record(ResourceEvent::Destroyed(ResourceKind::Group, group.0));
        Ok(())
    }

    fn destroy_container(&self, container: ContainerHandle) -> Result<(), TransportError> {
        let mut tables = self.tables.lock();
        tables.check_destroy_fault(ResourceKind::Container)?;
        if !tables.containers.contains_key(&container.0) {
            return Err(unknown(ContainerHandle::KIND, container.0));
        }
        let owns_live = tables.channels.values().any(|c| c.container == container.0)
            || tables.groups.values().any(|g| g.container == container.0);
        if owns_live {
            return Err(TransportError::StillInUse {
                kind: ContainerHandle::KIND,
                id: container.0,
            });
        }
        tables.containers.remove(&container.0);
        tables
            .journal
            .record(ResourceEvent::Destroyed(ResourceKind::Container, container.0));
        Ok(())
    }

    fn max_payload_size(&self) -> usize {
        self.max_payload
    }

    fn wait_for_sample(&self, endpoint: EndpointHandle, timeout: Duration) {
        let parked = {
            let tables = self.tables.lock();
            match tables.endpoints.get(&endpoint.0).map(|e| &e.state) {
                Some(EndpointState::Reader { queue, signal, .. }) if queue.is_empty() => {
                    Some((Arc::clone(signal), signal.load(Ordering::Acquire)))
                }
                _ => None,
            }
        };

        if let Some((signal, seen)) = parked {
            futex_wait_timeout(&signal, seen, timeout);
        }
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_loopback(self, f)
    }
}
