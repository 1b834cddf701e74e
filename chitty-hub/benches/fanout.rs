//! Fan-out benchmarks
//!
//! Run with: cargo bench -p chitty-hub --bench fanout

use std::hint::black_box;
use std::sync::Arc;

use chitty_core::{LamportClock, MessageDraft};
use chitty_hub::{Broadcaster, SubscriptionRegistry};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

/// Benchmark: clock advance under no contention
fn bench_clock_advance(c: &mut Criterion) {
    let clock = LamportClock::new();

    c.bench_function("clock_advance", |b| {
        b.iter(|| black_box(clock.advance(black_box(17))))
    });
}

/// Benchmark: one broadcast to N subscribers, each channel drained afterwards
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for subscribers in [1usize, 16, 256] {
        let hub = Broadcaster::new(
            Arc::new(LamportClock::new()),
            Arc::new(SubscriptionRegistry::new(8, subscribers)),
        );
        let mut receivers: Vec<_> = (0..subscribers)
            .map(|i| {
                hub.subscribe(&format!("bench{i}"))
                    .expect("subscribe failed")
                    .1
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let message = hub.broadcast(MessageDraft::new("bench", "payload"));
                    for rx in &mut receivers {
                        black_box(rx.try_recv().ok());
                    }
                    black_box(message);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_clock_advance, bench_broadcast);
criterion_main!(benches);
