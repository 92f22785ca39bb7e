use std::sync::Arc;

use cardinal_dds::error::{OpenError, Step, TransportError};
use cardinal_dds::Channel::{self, Stage};
use cardinal_dds::Core::{loopback, LoopbackTransport, ResourceEvent, ResourceKind};
use cardinal_dds::{ChannelBuilder, Publisher, Subscriber, WireFormat};

const STEPS: [Step; 5] = [
    Step::Participant,
    Step::TypeRegistration,
    Step::Topic,
    Step::Group,
    Step::Endpoint,
];

fn recording() -> Arc<LoopbackTransport> {
    Arc::new(LoopbackTransport::new().with_journal(1024))
}

fn builder(transport: &Arc<LoopbackTransport>, name: &str) -> ChannelBuilder {
    ChannelBuilder::new()
        .with_channel_name(name)
        .with_transport(transport.clone())
}

fn open_publisher(transport: &Arc<LoopbackTransport>, name: &str) -> Result<Publisher, OpenError> {
    builder(transport, name).build_publisher()
}

fn open_subscriber(
    transport: &Arc<LoopbackTransport>,
    name: &str,
) -> Result<Subscriber, OpenError> {
    builder(transport, name).build_subscriber()
}

fn created(journal: &[ResourceEvent]) -> Vec<u64> {
    journal
        .iter()
        .filter_map(|e| match e {
            ResourceEvent::Created(_, id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn destroyed(journal: &[ResourceEvent]) -> Vec<u64> {
    journal
        .iter()
        .filter_map(|e| match e {
            ResourceEvent::Destroyed(_, id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn destroyed_kinds(journal: &[ResourceEvent]) -> Vec<ResourceKind> {
    journal
        .iter()
        .filter_map(|e| match e {
            ResourceEvent::Destroyed(kind, _) => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn test_failure_at_each_step_unwinds_in_reverse() {
    // Resources held when each step runs: container, topic, group.
    let held_before = [0, 1, 1, 2, 3];

    for (step, held) in STEPS.into_iter().zip(held_before) {
        for publish in [true, false] {
            let transport = recording();
            transport.fail_step(step);

            let err = if publish {
                open_publisher(&transport, "hello_topic").unwrap_err()
            } else {
                open_subscriber(&transport, "hello_topic").unwrap_err()
            };
            assert_eq!(err.step(), Some(step), "{err}");

            let journal = transport.journal();
            let acquired = created(&journal);
            let mut released = destroyed(&journal);
            assert_eq!(acquired.len(), held, "step {step}");

            // Exactly once, newest first.
            released.reverse();
            assert_eq!(released, acquired, "step {step}");
            assert_eq!(transport.live_resources(), 0, "step {step}");
        }
    }
}

#[test]
fn test_open_error_variant_matches_step() {
    let transport = recording();
    transport.fail_step(Step::TypeRegistration);

    let err = open_publisher(&transport, "hello_topic").unwrap_err();
    assert_eq!(
        err,
        OpenError::TypeRegistrationFailed(TransportError::Injected(Step::TypeRegistration))
    );
    assert!(err.to_string().starts_with("type registration failed"));

    transport.clear_faults();
    transport.fail_step(Step::Endpoint);
    assert!(matches!(
        open_subscriber(&transport, "hello_topic"),
        Err(OpenError::EndpointCreationFailed(TransportError::Injected(Step::Endpoint)))
    ));
}

#[test]
fn test_invalid_channel_names_acquire_nothing() {
    let transport = recording();

    for name in ["", "bad\0name"] {
        let err = open_publisher(&transport, name).unwrap_err();
        assert_eq!(err, OpenError::InvalidChannelName(name.to_string()));
        assert_eq!(err.step(), None);
    }
    assert!(transport.journal().is_empty());
}

#[test]
fn test_close_releases_child_first() {
    let transport = recording();
    let mut publisher = open_publisher(&transport, "hello_topic").unwrap();

    assert!(publisher.is_open());
    assert_eq!(publisher.stage(), Stage::Ready);
    assert_eq!(transport.live_resources(), 4);

    let journal = transport.journal();
    assert!(journal.contains(&ResourceEvent::ShapeRegistered {
        container: created(&journal)[0],
        type_name: "SimpleMessage".to_string(),
    }));

    transport.clear_journal();
    publisher.close();

    assert!(!publisher.is_open());
    assert_eq!(publisher.stage(), Stage::Unopened);
    assert_eq!(transport.live_resources(), 0);
    assert_eq!(
        destroyed_kinds(&transport.journal()),
        vec![
            ResourceKind::Endpoint,
            ResourceKind::Group,
            ResourceKind::Channel,
            ResourceKind::Container,
        ]
    );
}

#[test]
fn test_close_is_idempotent() {
    let transport = recording();
    let mut subscriber = open_subscriber(&transport, "hello_topic").unwrap();

    subscriber.close();
    let after_first = transport.journal().len();
    subscriber.close();
    subscriber.close();

    assert_eq!(transport.journal().len(), after_first);
    assert_eq!(transport.live_resources(), 0);
}

#[test]
fn test_drop_releases_resources() {
    let transport = recording();
    {
        let _publisher = open_publisher(&transport, "hello_topic").unwrap();
        let _subscriber = open_subscriber(&transport, "hello_topic").unwrap();
        assert_eq!(transport.live_resources(), 8);
    }
    assert_eq!(transport.live_resources(), 0);
}

#[test]
fn test_teardown_continues_past_failed_release() {
    let transport = recording();
    let mut publisher = open_publisher(&transport, "hello_topic").unwrap();

    transport.fail_destroy(ResourceKind::Group);
    transport.clear_journal();
    publisher.close();

    // The group refuses to go, so its container stays too; the rest is released.
    let kinds = destroyed_kinds(&transport.journal());
    assert_eq!(kinds, vec![ResourceKind::Endpoint, ResourceKind::Channel]);
    assert_eq!(transport.live_resources(), 2);
    assert!(!publisher.is_open());

    // A second close does not retry.
    publisher.close();
    assert_eq!(destroyed_kinds(&transport.journal()).len(), 2);
}

#[test]
fn test_failed_unwind_step_does_not_stop_unwind() {
    let transport = recording();
    transport.fail_step(Step::Endpoint);
    transport.fail_destroy(ResourceKind::Channel);

    assert!(open_publisher(&transport, "hello_topic").is_err());

    // Group released, topic refused, container still owns the topic.
    let kinds = destroyed_kinds(&transport.journal());
    assert_eq!(kinds, vec![ResourceKind::Group]);
    assert_eq!(transport.live_resources(), 2);
}

#[test]
fn test_shape_mismatch_fails_at_topic() {
    let transport = recording();
    let _fixed = builder(&transport, "shared_topic")
        .with_wire_format(WireFormat::Fixed)
        .build_publisher()
        .unwrap();
    let live = transport.live_resources();

    let err = open_subscriber(&transport, "shared_topic").unwrap_err();
    assert!(matches!(
        err,
        OpenError::TopicCreationFailed(TransportError::ShapeMismatch { .. })
    ));
    assert_eq!(transport.live_resources(), live);

    // Other domains are unaffected.
    let other = builder(&transport, "shared_topic")
        .with_domain_id(7)
        .build_subscriber();
    assert!(other.is_ok());
}

#[test]
fn test_repeated_failed_opens_do_not_leak() {
    let transport = recording();
    for i in 0..200 {
        let step = STEPS[i % STEPS.len()];
        transport.clear_faults();
        transport.fail_step(step);
        assert!(open_publisher(&transport, "hello_topic").is_err());
    }
    assert_eq!(transport.live_resources(), 0);

    transport.clear_faults();
    let publisher = open_publisher(&transport, "hello_topic").unwrap();
    assert!(publisher.is_open());
}

#[test]
fn test_debug_output_names_the_channel() {
    let transport = recording();
    let publisher = open_publisher(&transport, "debug_topic").unwrap();

    let rendered = format!("{publisher:?}");
    assert!(rendered.starts_with("Publisher"));
    assert!(rendered.contains("debug_topic"));
    assert!(rendered.contains("writer"));

    let rendered = format!("{transport:?}");
    assert!(rendered.contains("Cardinal_Participant"));
    assert!(rendered.contains("live_resources: 4"));
}

#[test]
fn test_journal_is_off_by_default() {
    let transport = Arc::new(LoopbackTransport::new());
    for _ in 0..1000 {
        let mut publisher = open_publisher(&transport, "quiet_topic").unwrap();
        let mut subscriber = open_subscriber(&transport, "quiet_topic").unwrap();
        publisher.close();
        subscriber.close();
    }
    assert!(transport.journal().is_empty());
    assert_eq!(transport.live_resources(), 0);
}

#[test]
fn test_journal_keeps_only_latest_events() {
    let transport = Arc::new(LoopbackTransport::new().with_journal(8));
    for _ in 0..50 {
        let mut publisher = open_publisher(&transport, "hello_topic").unwrap();
        publisher.close();
    }

    let journal = transport.journal();
    assert_eq!(journal.len(), 8);
    assert!(journal[7].is_destroyed(ResourceKind::Container));
}

#[test]
fn test_shared_transport_records_nothing() {
    for _ in 0..1000 {
        let mut publisher = Channel::open_publisher("shared_journal_topic").unwrap();
        let mut subscriber = Channel::open_subscriber("shared_journal_topic").unwrap();
        publisher.close();
        subscriber.close();
    }
    assert!(loopback::shared().journal().is_empty());
}
