//! Notifier refresh benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use livediff_bench::{bench_schema, ITEM};
use livediff_core::{
    KeyPathsCollection, MemorySource, Notifier, NotifierConfig, ObjectId, ResultsQuery,
};
use std::sync::Arc;

/// Create a source holding `count` items and a notifier over it.
fn setup(count: usize) -> (Arc<MemorySource>, Notifier, Vec<ObjectId>) {
    let source = Arc::new(MemorySource::new(bench_schema()).unwrap());
    let ids = source
        .transaction(|txn| {
            let mut ids = Vec::with_capacity(count);
            for i in 0..count {
                let id = txn.create(ITEM)?;
                txn.set(id, "Name", format!("item {i}"))?;
                txn.set(id, "Rank", i as i64)?;
                ids.push(id);
            }
            Ok(ids)
        })
        .unwrap();
    let notifier = Notifier::new(source.clone(), NotifierConfig::default());
    (source, notifier, ids)
}

/// Benchmark a refresh after one property write.
fn bench_refresh_after_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_after_write");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (source, notifier, ids) = setup(count);
            let lineage = source.results(ResultsQuery::all(ITEM)).unwrap();
            let _token = notifier
                .collection(lineage)
                .unwrap()
                .subscribe(|n| { black_box(n); }, None)
                .unwrap();
            notifier.refresh();

            let mut rank = 0i64;
            b.iter(|| {
                rank += 1;
                source
                    .transaction(|txn| txn.set(ids[count / 2], "Rank", rank))
                    .unwrap();
                black_box(notifier.refresh());
            });
        });
    }
    group.finish();
}

/// Benchmark fan-out to many subscriptions on one collection.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_fan_out");

    for subscribers in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            subscribers,
            |b, &subscribers| {
                let (source, notifier, ids) = setup(1_000);
                let lineage = source.results(ResultsQuery::all(ITEM)).unwrap();
                let collection = notifier.collection(lineage).unwrap();
                let tokens: Vec<_> = (0..subscribers)
                    .map(|i| {
                        let key_paths = if i % 2 == 0 {
                            None
                        } else {
                            Some(KeyPathsCollection::parse_all(["Name"]).unwrap())
                        };
                        collection
                            .subscribe(|n| { black_box(n); }, key_paths)
                            .unwrap()
                    })
                    .collect();
                notifier.refresh();

                let mut rank = 0i64;
                b.iter(|| {
                    rank += 1;
                    source
                        .transaction(|txn| txn.set(ids[0], "Rank", rank))
                        .unwrap();
                    black_box(notifier.refresh());
                });
                drop(tokens);
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_refresh_after_write, bench_fan_out);
criterion_main!(benches);
