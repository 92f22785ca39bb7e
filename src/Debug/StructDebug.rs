use std::fmt;

use crate::Channel::{Publisher, Subscriber};
use crate::Core::LoopbackTransport;

/// Debug function for Publisher
///
/// Shows:
/// - Channel name and wire format
/// - The resource chain handles while open
/// - Messages sent so far
pub fn debug_publisher(publisher: &Publisher, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("Publisher");
    s.field("channel", &publisher.channel_name())
        .field("format", &publisher.wire_format())
        .field("stage", &publisher.stage());
    if let Some(chain) = &publisher.chain {
        s.field("container", &format_args!("{}", chain.container))
            .field("topic", &format_args!("{}", chain.channel))
            .field("group", &format_args!("{}", chain.group))
            .field("writer", &format_args!("{}", chain.endpoint));
    }
    s.field("messages_sent", &publisher.messages_sent()).finish()
}

/// Debug function for Subscriber
pub fn debug_subscriber(subscriber: &Subscriber, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("Subscriber");
    s.field("channel", &subscriber.channel_name())
        .field("format", &subscriber.wire_format())
        .field("stage", &subscriber.stage())
        .field("receive_timeout", &subscriber.receive_timeout());
    if let Some(chain) = &subscriber.chain {
        s.field("container", &format_args!("{}", chain.container))
            .field("topic", &format_args!("{}", chain.channel))
            .field("group", &format_args!("{}", chain.group))
            .field("reader", &format_args!("{}", chain.endpoint));
    }
    s.field("messages_received", &subscriber.messages_received())
        .field("corrupt_samples", &subscriber.corrupt_samples())
        .finish()
}

/// Debug function for LoopbackTransport
///
/// Takes the table lock briefly; lists participants by name and domain
/// and counts everything else, without dumping queued payloads.
pub fn debug_loopback(transport: &LoopbackTransport, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tables = transport.tables.lock();
    let participants: Vec<String> = tables
        .containers
        .iter()
        .map(|(id, c)| format!("{}#{id}@{}", c.name, c.domain_id))
        .collect();

    f.debug_struct("LoopbackTransport")
        .field("participants", &participants)
        .field("topics", &tables.channels.len())
        .field("live_resources", &tables.live_count())
        .finish_non_exhaustive()
}
