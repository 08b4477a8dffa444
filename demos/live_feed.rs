//! Demonstration of live dwell detection.
//!
//! This example shows how to:
//! 1. Create a bounded sample channel
//! 2. Feed it from a tracker thread (here a synthetic gesture)
//! 3. Consume clusters lazily as the gesture unfolds
//! 4. Stop early with Ctrl+C through a shared cancellation token
//! 5. Merge near-duplicate clusters and build a gesture trace
//!
//! Run with: cargo run --example live_feed

use std::thread;
use std::time::Duration;

use gesture_dwell::{
    core::{ClusterMerger, DwellClusters, MergeConfig, TraceBuilder},
    sample_channel,
    stats::create_shared_stats,
    CancelToken, DetectorConfig, Sample, Strategy,
};

/// Key centres the synthetic gesture visits, in order.
const KEYS: [(f64, f64); 5] = [
    (40.0, 60.0),
    (120.0, 64.0),
    (128.0, 70.0),
    (260.0, 30.0),
    (250.0, 140.0),
];

/// Slow jittery dwell on every key joined by fast straight transitions.
fn synthetic_gesture() -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut k: i64 = 0;
    for (index, &(x, y)) in KEYS.iter().enumerate() {
        if index > 0 {
            let (px, py) = KEYS[index - 1];
            for step in 1..7 {
                let t = f64::from(step) / 7.0;
                samples.push(Sample::new(px + (x - px) * t, py + (y - py) * t));
            }
        }
        for _ in 0..12 {
            let jx = ((k * 7) % 5 - 2) as f64;
            let jy = ((k * 3) % 5 - 2) as f64;
            k += 1;
            samples.push(Sample::new(x + jx, y + jy));
        }
    }
    samples
}

fn main() {
    println!("Gesture Dwell - Live Feed Demo");
    println!("==============================");
    println!();

    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || token.cancel()).expect("Error setting Ctrl+C handler");

    let (sender, source) = sample_channel(256);
    let source = source.with_cancel(cancel.clone());

    // Tracker thread: one sample every 10ms
    let producer = thread::spawn(move || {
        for sample in synthetic_gesture() {
            if sender.send(sample).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
    });

    let config = DetectorConfig::default().with_strategy(Strategy::VelocityAndBearing);
    let stats = create_shared_stats();
    let merge_config = MergeConfig::new(12.0);
    let mut merger = ClusterMerger::new(merge_config.clone());
    let mut clusters = Vec::new();

    println!("Tracing the gesture... (Ctrl+C to stop early)");
    println!();

    let mut stream = source
        .dwell_clusters(config.clone())
        .expect("default configuration is valid")
        .with_cancel(cancel.clone());

    for result in stream.by_ref() {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                eprintln!("Detector error: {e}");
                break;
            }
        };
        println!(
            "  Dwell at ({:.1}, {:.1})  ticks {}..{}  bearing {:?}",
            event.mean_x, event.mean_y, event.start_tick, event.end_tick, event.entry_bearing
        );
        if let Some(ready) = merger.push(event) {
            stats.record_cluster();
            clusters.push(ready);
        }
    }
    if let Some(ready) = merger.finish() {
        stats.record_cluster();
        clusters.push(ready);
    }
    stats.record_merges(merger.merges());
    let samples_seen = stream.detector().samples_seen();
    stats.record_samples(samples_seen);

    if cancel.is_cancelled() {
        println!();
        if stream.discarded_dwell() {
            stats.record_discarded_dwell();
            println!("Cancelled, in-progress dwell discarded.");
        } else {
            println!("Cancelled.");
        }
    } else {
        stats.record_stream_completed();
    }

    let _ = producer.join();

    let trace = TraceBuilder::new()
        .with_label("demo")
        .build(&config, Some(&merge_config), samples_seen, clusters);

    println!();
    println!("=== Gesture Complete ===");
    for (i, (x, y)) in trace.points().iter().enumerate() {
        println!("  [{}] ({x:.1}, {y:.1})", i + 1);
    }
    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
