// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic hot-key-cascade usage example.
//!
//! Demonstrates:
//! 1. Building a cascade over an in-memory store
//! 2. A cold key reading straight through to the store
//! 3. A key crossing the hot threshold and moving to the fallback cache
//! 4. Per-key throttling of a hot key that keeps missing the cache
//! 5. Per-key stats and the hot-key list
//! 6. Displaying metrics
//! 7. Clean shutdown of the maintenance task
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=hot_key_cascade=debug cargo run --example basic_usage
//! ```

use std::sync::Arc;

use hot_key_cascade::{CascadeConfig, HotKeyCascade, InMemoryStore, RateLimitConfig, ReadOutcome};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           hot-key-cascade: Basic Usage Example                ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure the cascade
    // ─────────────────────────────────────────────────────────────────────────
    let config = CascadeConfig {
        threshold: 5,
        rate_limit: RateLimitConfig::new(1.0, 3),
        ..Default::default()
    };
    config.validate()?;

    let cascade = HotKeyCascade::new(config, Arc::new(InMemoryStore::new()));
    let maintenance = cascade.spawn_maintenance();
    println!("📦 Cascade ready (threshold=5, rate=1/s, burst=3)\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Cold key
    // ─────────────────────────────────────────────────────────────────────────
    cascade.write("user:1", b"alice".to_vec()).await?;
    let outcome = cascade.read("user:1").await?;
    println!("❄️  user:1 -> {:?}", outcome.source());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Key turning hot
    // ─────────────────────────────────────────────────────────────────────────
    cascade.write("sku:42", b"in stock".to_vec()).await?;
    for i in 1..=8 {
        let outcome = cascade.read("sku:42").await?;
        println!("🔥 sku:42 read #{} -> {:?}", i, outcome.source());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Hot key with nothing to cache gets throttled
    // ─────────────────────────────────────────────────────────────────────────
    println!();
    for i in 1..=10 {
        match cascade.read("ghost").await? {
            ReadOutcome::Throttled { retry_after } => {
                println!("⛔ ghost read #{} -> throttled, retry in {:?}", i, retry_after)
            }
            other => println!("👻 ghost read #{} -> HTTP {}", i, other.http_status_code()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Stats
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📊 Key stats:");
    for key in ["user:1", "sku:42", "ghost"] {
        let stats = cascade.stats(key)?;
        println!(
            "   {:<8} count={:<3} hot={:<5} cached={}",
            stats.key, stats.access_count, stats.is_hot, stats.in_fallback_cache
        );
    }
    println!("   hot keys: {:?}", cascade.list_hot());

    let snapshot = cascade.snapshot();
    println!(
        "   fallback hit rate {:.0}%, admission allowed={} denied={}",
        snapshot.fallback.hit_rate * 100.0,
        snapshot.admission.allowed,
        snapshot.admission.denied
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Raw metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics:");
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 7. Clean shutdown
    // ─────────────────────────────────────────────────────────────────────────
    maintenance.shutdown().await;
    println!("\n✅ Done");
    Ok(())
}

/// Dump all captured counters and gauges, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines: Vec<String> = Vec::new();

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => lines.push(format!("{}{} = {}", key.name(), label_str, v)),
            DebugValue::Gauge(v) => lines.push(format!("{}{} = {:.2}", key.name(), label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                lines.push(format!("{}{} (samples={})", key.name(), label_str, samples.len()))
            }
        }
    }

    lines.sort();
    if lines.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
    for line in lines {
        println!("   └─ {}", line);
    }
}
