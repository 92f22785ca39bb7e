// Id-keyed registry for embedding hosts.
//
// The host never sees a pointer: every open handle is stored here under a
// non-zero u64 and looked up on each call, so a stale or repeated close is
// just a missing key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::config::ChannelConfig;
use crate::error::{HostError, OpenError};
use crate::Channel::{ChannelBuilder, Publisher, Subscriber};
use crate::Core::{loopback, Transport};
use crate::Wire::Message;

/// Opaque identifier handed to the host. Never zero.
pub type HandleId = u64;

enum Registered {
    Publisher(Publisher),
    Subscriber {
        subscriber: Subscriber,
        // A sample the host had no room for, returned by the next receive.
        held: Option<Message>,
    },
}

pub struct HostRegistry {
    transport: Arc<dyn Transport>,
    config: ChannelConfig,
    next_id: AtomicU64,
    handles: Mutex<HashMap<HandleId, Registered>>,
}

impl HostRegistry {
    pub fn new(transport: Arc<dyn Transport>, config: ChannelConfig) -> Self {
        Self {
            transport,
            config,
            next_id: AtomicU64::new(1),
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn builder(&self, name: &str) -> ChannelBuilder {
        ChannelBuilder::new()
            .with_channel_name(name)
            .with_config(self.config.clone())
            .with_transport(Arc::clone(&self.transport))
    }

    fn insert(&self, entry: Registered) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(id, entry);
        id
    }

    pub fn open_publisher(&self, name: &str) -> Result<HandleId, OpenError> {
        let publisher = self.builder(name).build_publisher()?;
        let id = self.insert(Registered::Publisher(publisher));
        tracing::debug!(id, channel = name, "host publisher registered");
        Ok(id)
    }

    pub fn open_subscriber(&self, name: &str) -> Result<HandleId, OpenError> {
        let subscriber = self.builder(name).build_subscriber()?;
        let id = self.insert(Registered::Subscriber {
            subscriber,
            held: None,
        });
        tracing::debug!(id, channel = name, "host subscriber registered");
        Ok(id)
    }

    pub fn send(&self, id: HandleId, text: &str, timestamp: i64) -> Result<(), HostError> {
        let handles = self.handles.lock();
        match handles.get(&id) {
            Some(Registered::Publisher(p)) => Ok(p.send(&Message::new(text, timestamp))?),
            Some(Registered::Subscriber { .. }) => Err(HostError::WrongMode {
                id,
                expected: "publisher",
            }),
            None => Err(HostError::UnknownHandle(id)),
        }
    }

    /// Non-blocking receive. `Ok(None)` means no sample was available.
    pub fn try_receive(&self, id: HandleId) -> Result<Option<Message>, HostError> {
        self.try_receive_within(id, usize::MAX)
    }

    /// Non-blocking receive of a message whose text is at most `capacity`
    /// bytes. A longer message stays queued on the handle and
    /// `BufferTooSmall` reports its size, so the host can retry with a
    /// larger buffer.
    pub fn try_receive_within(
        &self,
        id: HandleId,
        capacity: usize,
    ) -> Result<Option<Message>, HostError> {
        let mut handles = self.handles.lock();
        match handles.get_mut(&id) {
            Some(Registered::Subscriber { subscriber, held }) => {
                let next = match held.take() {
                    Some(message) => Some(message),
                    None => subscriber.try_receive(Duration::ZERO)?,
                };
                match next {
                    Some(message) if message.text.len() > capacity => {
                        let needed = message.text.len();
                        *held = Some(message);
                        Err(HostError::BufferTooSmall { needed })
                    }
                    next => Ok(next),
                }
            }
            Some(Registered::Publisher(_)) => Err(HostError::WrongMode {
                id,
                expected: "subscriber",
            }),
            None => Err(HostError::UnknownHandle(id)),
        }
    }

    /// Close a publisher. Unknown ids, zero, and subscriber ids are ignored.
    pub fn close_publisher(&self, id: HandleId) {
        let removed = {
            let mut handles = self.handles.lock();
            match handles.get(&id) {
                Some(Registered::Publisher(_)) => handles.remove(&id),
                _ => None,
            }
        };
        // Teardown runs outside the registry lock.
        if let Some(Registered::Publisher(mut p)) = removed {
            p.close();
        }
    }

    /// Close a subscriber. Unknown ids, zero, and publisher ids are ignored.
    pub fn close_subscriber(&self, id: HandleId) {
        let removed = {
            let mut handles = self.handles.lock();
            match handles.get(&id) {
                Some(Registered::Subscriber { .. }) => handles.remove(&id),
                _ => None,
            }
        };
        if let Some(Registered::Subscriber { mut subscriber, .. }) = removed {
            subscriber.close();
        }
    }

    /// Close every open handle.
    pub fn close_all(&self) {
        let drained: Vec<Registered> = self.handles.lock().drain().map(|(_, h)| h).collect();
        for entry in drained {
            match entry {
                Registered::Publisher(mut p) => p.close(),
                Registered::Subscriber { mut subscriber, .. } => subscriber.close(),
            }
        }
    }

    pub fn open_handles(&self) -> usize {
        self.handles.lock().len()
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: HostRegistry =
        HostRegistry::new(loopback::shared(), ChannelConfig::from_env());
}

/// The process-wide registry backing the free functions below and the FFI.
pub fn registry() -> &'static HostRegistry {
    &DEFAULT_REGISTRY
}

pub fn open_publisher(name: &str) -> Result<HandleId, OpenError> {
    registry().open_publisher(name)
}

pub fn send(id: HandleId, text: &str, timestamp: i64) -> Result<(), HostError> {
    registry().send(id, text, timestamp)
}

pub fn close_publisher(id: HandleId) {
    registry().close_publisher(id)
}

pub fn open_subscriber(name: &str) -> Result<HandleId, OpenError> {
    registry().open_subscriber(name)
}

pub fn try_receive(id: HandleId) -> Result<Option<Message>, HostError> {
    registry().try_receive(id)
}

pub fn try_receive_within(id: HandleId, capacity: usize) -> Result<Option<Message>, HostError> {
    registry().try_receive_within(id, capacity)
}

pub fn close_subscriber(id: HandleId) {
    registry().close_subscriber(id)
}
