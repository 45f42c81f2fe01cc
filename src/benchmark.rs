use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tsappend::appender::{AppendOutcome, AppenderConfig, Error, Label, MetricsCache};
use tsappend::client::{IssuedRequest, MemoryStore};
use tsappend::partition::{PartitionConfig, PartitionGranularity};

const NUM_METRICS: usize = 100;
const SAMPLES_PER_METRIC: usize = 10_000;
const SCRAPE_INTERVAL_MS: i64 = 10_000;
const LATE_RATIO: f64 = 0.01; // share of samples delivered up to 30 minutes late
const MAX_LATE_MS: i64 = 30 * 60 * 1000;

pub fn run_benchmarks() {
    println!(
        "Running ingest benchmarks with {} metrics x {} samples...",
        NUM_METRICS, SAMPLES_PER_METRIC
    );

    let samples = generate_test_data();

    for &flush_every in &[100, 1000, 10000] {
        let result = benchmark_ingest(&samples, flush_every);
        println!("\nFlush every {} samples:", flush_every);
        println!("Ingest time: {:.2}ms", result.elapsed_ms);
        println!("Update requests: {}", result.updates);
        println!("Expression bytes: {}", result.expression_bytes);
        println!("Dropped late samples: {}", result.dropped);
        println!("Backpressure retries: {}", result.retries);
        println!("Items written: {}", result.items);
    }
}

struct IngestResult {
    elapsed_ms: f64,
    updates: usize,
    expression_bytes: usize,
    dropped: usize,
    retries: usize,
    items: usize,
}

fn generate_test_data() -> Vec<(usize, i64, f64)> {
    let mut rng = rand::rng();
    let mut samples = Vec::with_capacity(NUM_METRICS * SAMPLES_PER_METRIC);

    for step in 0..SAMPLES_PER_METRIC as i64 {
        for metric in 0..NUM_METRICS {
            let mut t = step * SCRAPE_INTERVAL_MS + rng.random_range(0..100);
            if rng.random::<f64>() < LATE_RATIO {
                t -= rng.random_range(0..MAX_LATE_MS);
            }
            samples.push((metric, t.max(0), rng.random::<f64>() * 100.0)); // Random values 0-100
        }
    }

    samples
}

fn benchmark_ingest(samples: &[(usize, i64, f64)], flush_every: usize) -> IngestResult {
    let store = Arc::new(MemoryStore::new());
    let partitions = PartitionConfig {
        granularity: PartitionGranularity::Day,
        chunk_interval_ms: 60 * 60 * 1000,
    };
    let mut cache = MetricsCache::new(AppenderConfig::default(), partitions, store.clone())
        .expect("valid partition config");

    let mut dropped = 0;
    let mut retries = 0;
    let start = Instant::now();

    for (i, &(metric, t, v)) in samples.iter().enumerate() {
        let labels = vec![
            Label::new("__name__", "cpu_usage"),
            Label::new("host", format!("host-{}", metric)),
        ];

        let outcome = match cache.add(labels.clone(), t, v) {
            Err(Error::Backpressure { .. }) => {
                // let the in-flight flush land before rotating
                retries += 1;
                cache.dispatch(store.drain_responses());
                cache.add(labels, t, v)
            }
            other => other,
        };
        if let Ok(AppendOutcome::Dropped) = outcome {
            dropped += 1;
        }

        if (i + 1) % flush_every == 0 {
            cache.dispatch(store.drain_responses());
            cache.flush();
        }
    }

    while cache.updates_behind() > 0 {
        cache.dispatch(store.drain_responses());
        if cache.flush().issued == 0 && store.pending_responses() == 0 {
            break;
        }
    }
    cache.dispatch(store.drain_responses());

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let (updates, expression_bytes) = store
        .issued()
        .iter()
        .filter_map(|r| match r {
            IssuedRequest::Update { expression, .. } => Some(expression.len()),
            IssuedRequest::Get { .. } => None,
        })
        .fold((0, 0), |(n, bytes), len| (n + 1, bytes + len));

    IngestResult {
        elapsed_ms,
        updates,
        expression_bytes,
        dropped,
        retries,
        items: store.item_count(),
    }
}
