//! Demonstration of the Emotion Sentinel Agent capture pipeline.
//!
//! This example shows how to:
//! 1. Build a synthetic capture source
//! 2. Start the capture worker
//! 3. Poll annotated frames on the consumer side
//! 4. Watch the sustained-negative warning raise and clear
//! 5. Finish the session and evaluate it
//!
//! Run with: cargo run --example session_demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use emotion_sentinel_agent::{
    capture::{CaptureWorker, WorkerSettings},
    stats::create_shared_stats,
    synthetic::SyntheticStageFactory,
    transport,
    vision::EmotionLabel,
    DATA_HANDLING_DECLARATION,
};

fn main() {
    println!("Emotion Sentinel Agent - Session Demo");
    println!("=====================================");
    println!();

    // Display data handling notice
    println!("{DATA_HANDLING_DECLARATION}");
    println!();

    // Build a synthetic source: a drifting bright disc stands in for the
    // camera, a scripted timeline stands in for the classifier. The
    // Sad/Angry stretch runs long enough to cross the warning threshold.
    let factory = Arc::new(
        SyntheticStageFactory::new()
            .with_timeline(vec![
                EmotionLabel::Neutral,
                EmotionLabel::Happy,
                EmotionLabel::Sad,
                EmotionLabel::Angry,
                EmotionLabel::Neutral,
            ])
            .with_hold(50)
            .cycling(),
    );

    let stats = create_shared_stats();
    let (publisher, receiver) = transport::channel();
    let mut worker = CaptureWorker::new(
        factory,
        publisher,
        Arc::clone(&stats),
        WorkerSettings::default(),
    );

    println!("Device ID: {}", worker.device());
    println!();
    println!("Capturing for 15 seconds...");
    println!();

    // Start the session
    if let Err(e) = worker.start() {
        eprintln!("Error starting session: {e}");
        return;
    }

    // Set up stop flag
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    // Poll frames for 15 seconds
    let start = std::time::Instant::now();
    let mut frame_count = 0u64;
    let mut warning_on = false;

    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(15) {
        std::thread::sleep(Duration::from_millis(50));

        let packet = match receiver.try_receive() {
            Some(packet) => packet,
            None => continue,
        };
        frame_count += 1;

        // Report warning edges
        if packet.info.warning != warning_on {
            warning_on = packet.info.warning;
            println!();
            if warning_on {
                println!("  *** Sustained negative emotion warning RAISED ***");
            } else {
                println!("  *** Warning cleared ***");
            }
            println!();
        }

        if frame_count <= 5 || frame_count % 20 == 0 {
            println!(
                "  Frame at {}: {} ({} bytes, {} face(s))",
                packet.info.captured_at.format("%H:%M:%S%.3f"),
                packet.info.alert_label(),
                packet.jpeg.len(),
                packet.info.observations.len()
            );
        }
    }

    // Stop capture and collect the outcome
    println!();
    println!("Stopping capture...");
    let outcome = match worker.stop_and_finish() {
        Some(outcome) => outcome,
        None => {
            eprintln!("Session thread reported no outcome");
            return;
        }
    };

    println!();
    println!("=== Session Complete ===");
    println!("  Session ID: {}", outcome.session.session_id);
    println!("  Stop cause: {}", outcome.cause);
    println!("  Periods: {}", outcome.session.total_periods());
    println!();

    // Chronological period timeline
    for period in outcome.session.timeline() {
        println!(
            "  {} -> {}  {} ({} ms)",
            period.start.format("%H:%M:%S%.3f"),
            period.end.format("%H:%M:%S%.3f"),
            period.label,
            period.duration_ms()
        );
    }

    println!();
    println!("{}", outcome.assessment.summary());

    // Show snippet of the export JSON
    let json = serde_json::to_string_pretty(&outcome).unwrap();
    println!();
    println!("  Session export (truncated):");
    for line in json.lines().take(20) {
        println!("    {line}");
    }
    println!("    ...");

    // Final statistics
    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
