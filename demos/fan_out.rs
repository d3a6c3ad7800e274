//! Fan-out logging example
//!
//! Demonstrates one logger feeding a console and two files, each with its own
//! batching, from several threads at once.
//!
//! Run with: cargo run --example fan_out

use rust_log_pipeline::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Fan-out Example ===\n");

    let on_failure: FailureCallback = Arc::new(|faults: &[ChainFault]| {
        for fault in faults {
            eprintln!("destination failed: {}", fault);
        }
    });

    let logger = Logger::builder()
        .destination(ConsoleDestination::new().with_batch_policy(BatchPolicy::immediate()))
        .destination(
            FileDestination::new("fan_out.log")
                .with_batch_policy(BatchPolicy::new(25, Duration::from_millis(50))),
        )
        .destination(
            FileDestination::new("fan_out.jsonl")
                .with_format(LineFormat::Json)
                .with_batch_policy(BatchPolicy::new(100, Duration::from_millis(200))),
        )
        .on_failure(on_failure)
        .build()?;

    println!("1. Single-threaded logging:");
    logger.info("Pipeline started")?;
    logger.debug(format!("{} destinations attached", logger.destination_count()))?;
    logger.warn("Disk usage at 85%")?;

    println!("\n2. Multi-threaded logging:");
    let logger = Arc::new(logger);
    let handles: Vec<_> = (0..4)
        .map(|thread_id| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || -> Result<()> {
                for i in 0..10 {
                    rust_log_pipeline::info!(logger, "Thread {} - Message {}", thread_id, i)?;
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        if let Ok(result) = handle.join() {
            result?;
        }
    }

    logger.error("Simulated failure in request handler")?;

    println!("\n3. Shutdown:");
    logger.dispose()?;

    for (name, metrics) in logger.metrics() {
        println!(
            "   {}: {} entries in {} batches",
            name,
            metrics.entries_delivered(),
            metrics.batches_delivered()
        );
    }

    println!("\n=== Example completed successfully! ===");
    println!("Check 'fan_out.log' and 'fan_out.jsonl' for file output");

    Ok(())
}
