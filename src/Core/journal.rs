use std::collections::VecDeque;
use std::fmt;

/// The four kinds of resource a channel holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Container,
    Channel,
    Group,
    Endpoint,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Container => "container",
            ResourceKind::Channel => "channel",
            ResourceKind::Group => "group",
            ResourceKind::Endpoint => "endpoint",
        };
        f.write_str(name)
    }
}

/// A create or destroy recorded by the loopback transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Created(ResourceKind, u64),
    ShapeRegistered { container: u64, type_name: String },
    Destroyed(ResourceKind, u64),
}

impl ResourceEvent {
    pub fn is_created(&self, kind: ResourceKind) -> bool {
        matches!(self, ResourceEvent::Created(k, _) if *k == kind)
    }

    pub fn is_destroyed(&self, kind: ResourceKind) -> bool {
        matches!(self, ResourceEvent::Destroyed(k, _) if *k == kind)
    }
}

/// Bounded create / destroy log. Holds at most `capacity` events, dropping
/// the oldest; a capacity of zero records nothing.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    events: VecDeque<ResourceEvent>,
    capacity: usize,
}

impl Journal {
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.events.len() > capacity {
            self.events.pop_front();
        }
    }

    pub(crate) fn record(&mut self, event: ResourceEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub(crate) fn snapshot(&self) -> Vec<ResourceEvent> {
        self.events.iter().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}
