#![allow(clippy::unwrap_used)]

use std::f32::consts::TAU;
use std::hint::black_box;
use std::sync::Arc;

use bl_audio::BeatDetector;
use bl_core::{BeatEvent, DetectorConfig, MonotonicClock};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn signal(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (TAU * 440.0 * i as f32 / 44100.0).sin())
        .collect()
}

fn ingest(c: &mut Criterion) {
    let samples = signal(44100);
    let mut group = c.benchmark_group("ingest_batch");
    group.throughput(Throughput::Elements(samples.len() as u64));

    for band_count in [4, 16, 64] {
        let config = DetectorConfig {
            band_count,
            ..DetectorConfig::default()
        };
        let mut detector = BeatDetector::new(config, Arc::new(MonotonicClock::new())).unwrap();
        detector.subscribe(|e: &BeatEvent| -> anyhow::Result<()> {
            black_box(e);
            Ok(())
        });
        group.bench_with_input(BenchmarkId::from_parameter(band_count), &samples, |b, s| {
            b.iter(|| detector.ingest_batch(black_box(s)));
        });
    }
    group.finish();
}

criterion_group!(benches, ingest);
criterion_main!(benches);
