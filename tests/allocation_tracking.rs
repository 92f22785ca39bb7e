// Allocation tracking for repeated channel open / close cycles
//
// Note: Tests using dhat are marked with #[serial_test::serial] because
// dhat only allows one profiler to run at a time.
//
// # Run all allocation tracking tests
// cargo test --test allocation_tracking -- --nocapture

use std::sync::Arc;
use std::time::Duration;

use cardinal_dds::Core::LoopbackTransport;
use cardinal_dds::{ChannelBuilder, Message};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn open_send_receive_close(transport: &Arc<LoopbackTransport>, message: &Message) {
    let mut subscriber = ChannelBuilder::new()
        .with_transport(transport.clone())
        .build_subscriber()
        .unwrap();
    let mut publisher = ChannelBuilder::new()
        .with_transport(transport.clone())
        .build_publisher()
        .unwrap();

    publisher.send(message).unwrap();
    let received = subscriber.try_receive(Duration::ZERO).unwrap();
    assert_eq!(received.as_ref(), Some(message));

    publisher.close();
    subscriber.close();
}

#[test]
#[serial_test::serial]
fn test_open_close_cycles_with_dhat() {
    println!("\n--- Running open/close cycles with dhat ---");
    let _dhat = dhat::Profiler::new_heap();

    let transport = Arc::new(LoopbackTransport::new());
    let message = Message::new("cycle", 1);

    // Warm up table capacity before taking the baseline.
    for _ in 0..4 {
        open_send_receive_close(&transport, &message);
    }
    let baseline = dhat::HeapStats::get();

    for i in 0..500 {
        open_send_receive_close(&transport, &message);
        if i % 100 == 0 {
            println!("  Completed {} cycles", i);
        }
    }

    let after = dhat::HeapStats::get();
    println!("Heap before: {} bytes in {} blocks", baseline.curr_bytes, baseline.curr_blocks);
    println!("Heap after:  {} bytes in {} blocks", after.curr_bytes, after.curr_blocks);

    assert_eq!(transport.live_resources(), 0);
    assert!(
        after.curr_bytes <= baseline.curr_bytes + 4096,
        "heap grew from {} to {} bytes",
        baseline.curr_bytes,
        after.curr_bytes
    );
}

#[test]
#[serial_test::serial]
fn test_failed_opens_with_dhat() {
    use cardinal_dds::error::Step;

    println!("\n--- Running failed opens with dhat ---");
    let _dhat = dhat::Profiler::new_heap();

    let transport = Arc::new(LoopbackTransport::new());
    transport.fail_step(Step::Endpoint);

    let attempt = || {
        ChannelBuilder::new()
            .with_transport(transport.clone())
            .build_publisher()
            .is_err()
    };

    for _ in 0..4 {
        assert!(attempt());
    }
    let baseline = dhat::HeapStats::get();

    for _ in 0..500 {
        assert!(attempt());
    }

    let after = dhat::HeapStats::get();
    assert_eq!(transport.live_resources(), 0);
    assert!(
        after.curr_bytes <= baseline.curr_bytes + 4096,
        "heap grew from {} to {} bytes",
        baseline.curr_bytes,
        after.curr_bytes
    );
}

#[test]
#[serial_test::serial]
fn test_open_close_cycles_with_memory_stats() {
    println!("\n--- Running open/close cycles with memory-stats ---");
    use memory_stats::memory_stats;

    let before = memory_stats();
    println!("Memory before: {:?}", before);

    let transport = Arc::new(LoopbackTransport::new());
    let message = Message::new("x".repeat(1024), 2);
    for _ in 0..2000 {
        open_send_receive_close(&transport, &message);
    }

    let after = memory_stats();
    println!("Memory after: {:?}", after);

    if let (Some(before), Some(after)) = (before, after) {
        let growth = after.physical_mem.saturating_sub(before.physical_mem);
        println!("Physical memory growth: {} bytes", growth);
        assert!(growth < 64 * 1024 * 1024, "grew by {} bytes", growth);
    }
    assert_eq!(transport.live_resources(), 0);
}
