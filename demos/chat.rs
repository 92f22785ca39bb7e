// In demos/chat.rs
use cardinal_dds::logging::{init_logging, LoggingConfig};
use cardinal_dds::{ChannelBuilder, ChannelConfig, Message};
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_messages> [--auto-exit]", args[0]);
        std::process::exit(1);
    }

    let num_messages: usize = args[1].parse().expect("Invalid number of messages");
    let auto_exit = args.get(2).map(|s| s == "--auto-exit").unwrap_or(false);

    init_logging(&LoggingConfig::default());

    let config = ChannelConfig::from_env();
    let builder = || {
        ChannelBuilder::new()
            .with_channel_name("hello_topic")
            .with_config(config.clone())
            .with_history_depth(num_messages.max(config.history_depth))
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);

    // Handle Ctrl+C to stop both sides
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    // Subscriber first so nothing published below is missed
    let subscriber = builder().build_subscriber()?;
    println!("Chat: subscribed to {}", subscriber.channel_name());

    let running_for_reader = Arc::clone(&running);
    let reader = thread::spawn(move || {
        let mut received = 0;
        let start = Instant::now();
        let mut last_seen = start;
        println!("\n{:<10} {:<12} {}", "Msg #", "Timestamp", "Digest");
        println!("{}", "=".repeat(88));

        while received < num_messages && running_for_reader.load(Ordering::SeqCst) {
            match subscriber.try_receive(Duration::from_millis(100)) {
                Ok(Some(message)) => {
                    match message.text.split_once(':') {
                        Some((num, digest)) => {
                            println!("{:<10} {:<12} {}", num, message.timestamp, digest)
                        }
                        None => println!("Unexpected text: {}", message.text),
                    }
                    received += 1;
                    last_seen = Instant::now();
                }
                Ok(None) => {
                    if last_seen.elapsed() > Duration::from_secs(5) {
                        eprintln!("No message for 5s, giving up");
                        break;
                    }
                }
                Err(e) => eprintln!("Error receiving message: {}", e),
            }
        }

        let elapsed = start.elapsed();
        println!("{}", "=".repeat(88));
        println!("Chat: received {} messages in {:.2?}", received, elapsed);
        received
    });

    let publisher = builder().build_publisher()?;
    println!("Chat: publishing {} messages...", num_messages);

    let start_send = Instant::now();
    for i in 0..num_messages {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let digest = Sha256::digest(format!("message_{}", i).as_bytes());
        let message = Message::now(format!("{}:{:x}", i, digest));
        if let Err(e) = publisher.send(&message) {
            eprintln!("Failed to send message {}: {}", i, e);
        }
    }
    println!(
        "Chat: sent {} messages in {:.2?}",
        publisher.messages_sent(),
        start_send.elapsed()
    );

    let received = reader.join().expect("reader thread panicked");
    if received == num_messages {
        println!("All messages received successfully");
    }

    if !auto_exit {
        println!("Press Ctrl+C to exit...");
        while running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
        }
    }

    println!("Chat: shutting down");
    drop(publisher);
    Ok(())
}
