//! Stress tests for concurrent fan-out
//!
//! These tests verify:
//! - Every entry reaches every destination under heavy concurrent load
//! - Per-producer order survives batching on every chain
//! - A slow destination never holds back the others
//! - Cancellation terminates a loaded pipeline promptly

use rust_log_pipeline::destinations::MemoryDestination;
use rust_log_pipeline::{BatchPolicy, Logger, ShutdownOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 2_000;

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Test that heavy concurrent logging is delivered completely to every destination
#[test]
fn test_high_volume_fan_out_delivers_everything() {
    let sinks: Vec<MemoryDestination> = [1usize, 16, 64, 500]
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            MemoryDestination::new(BatchPolicy::new(size, Duration::from_millis(2)))
                .with_name(format!("sink-{}", i))
        })
        .collect();

    let mut builder = Logger::builder();
    for sink in &sinks {
        builder = builder.destination(sink.clone());
    }
    let logger = Arc::new(builder.build().expect("Failed to build logger"));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    logger
                        .info(format!("{}:{}", producer, seq))
                        .expect("log should succeed while running");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }
    logger.dispose().expect("graceful shutdown");

    for sink in &sinks {
        let messages = sink.messages();
        assert_eq!(messages.len(), PRODUCERS * PER_PRODUCER);

        // Each producer's entries arrive in the order it logged them
        let mut next: HashMap<usize, usize> = HashMap::new();
        for message in &messages {
            let (producer, seq) = message.split_once(':').expect("producer:seq");
            let producer: usize = producer.parse().unwrap();
            let seq: usize = seq.parse().unwrap();
            let expected = next.entry(producer).or_insert(0);
            assert_eq!(seq, *expected, "out of order for producer {}", producer);
            *expected += 1;
        }
        assert_eq!(sink.finalize_count(), 1);
    }

    for (name, metrics) in logger.metrics() {
        assert_eq!(
            metrics.entries_delivered(),
            (PRODUCERS * PER_PRODUCER) as u64,
            "{} delivered count",
            name
        );
        assert_eq!(metrics.entries_pending(), 0, "{} left entries behind", name);
    }
}

/// Test that a slow destination does not delay a fast one
#[test]
fn test_slow_destination_does_not_block_others() {
    let fast = MemoryDestination::new(BatchPolicy::new(10, Duration::from_millis(5))).with_name("fast");
    let slow = MemoryDestination::new(BatchPolicy::immediate())
        .with_name("slow")
        .with_write_delay(Duration::from_millis(200));

    let logger = Logger::builder()
        .destination(fast.clone())
        .destination(slow.clone())
        .build()
        .expect("Failed to build logger");

    for i in 0..100 {
        logger.info(format!("entry {}", i)).unwrap();
    }

    assert!(
        wait_until(Duration::from_secs(2), || fast.messages().len() == 100),
        "fast destination stalled behind the slow one"
    );
    assert!(slow.messages().len() < 100);

    logger.cancel();
    assert!(matches!(logger.shutdown(), ShutdownOutcome::Cancelled));
    assert_eq!(slow.finalize_count(), 1);
    assert_eq!(fast.finalize_count(), 1);
}

/// Test that cancelling under load terminates quickly and still finalizes
#[test]
fn test_cancel_under_load_terminates() {
    let sinks: Vec<MemoryDestination> = (0..4)
        .map(|i| {
            MemoryDestination::new(BatchPolicy::new(4, Duration::from_millis(1)))
                .with_name(format!("loaded-{}", i))
                .with_write_delay(Duration::from_millis(20))
        })
        .collect();

    let mut builder = Logger::builder();
    for sink in &sinks {
        builder = builder.destination(sink.clone());
    }
    let logger = Arc::new(builder.build().expect("Failed to build logger"));

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for seq in 0..5_000 {
                    // Entries posted after cancellation are discarded, not rejected
                    if logger.info(format!("{}:{}", producer, seq)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    logger.cancel();

    let start = Instant::now();
    let outcome = logger.shutdown();
    let elapsed = start.elapsed();

    for producer in producers {
        producer.join().expect("producer panicked");
    }

    assert!(matches!(outcome, ShutdownOutcome::Cancelled));
    assert!(
        elapsed < Duration::from_secs(2),
        "shutdown after cancel took {:?}",
        elapsed
    );
    for sink in &sinks {
        assert_eq!(sink.initialize_count(), 1);
        assert_eq!(sink.finalize_count(), 1);
        assert!(sink.messages().len() < 4 * 5_000);
    }
}
