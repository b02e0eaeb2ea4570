//! Resolution benchmarks: cached singleton hits, unscoped chains and
//! structured fan-out across container depths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use keyed_di::{Container, DependencyExt, Key, Scope};

/// Build a chain of unscoped keys where each depends on the previous one
fn build_chain(container: &Container, length: usize) -> Key<u64> {
    let mut previous = Key::<u64>::named("link-0");
    container.provide_instance(&previous, 1);

    for i in 1..length {
        let next = Key::<u64>::named(format!("link-{}", i));
        container.provide(&next, previous.clone(), |n| n + 1);
        previous = next;
    }

    previous
}

fn benchmark_cached_singleton(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_singleton");

    for depth in [0usize, 4, 16] {
        let root = Container::new();
        let key = Key::<u64>::builder("singleton").scope(Scope::SINGLETON).build();
        root.provide_fn(&key, || 42);

        let mut leaf = root.clone();
        for _ in 0..depth {
            leaf = leaf.create_child();
        }
        leaf.request(&key).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(leaf.request(&key).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_unscoped_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("unscoped_chain");

    for length in [1usize, 8, 32] {
        let container = Container::new();
        let tail = build_chain(&container, length);

        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            b.iter(|| black_box(container.request(&tail).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [2usize, 16, 64] {
        let container = Container::new();
        let keys: Vec<Key<u64>> = (0..width)
            .map(|i| {
                let key = Key::<u64>::builder(format!("member-{}", i))
                    .scope(Scope::SINGLETON)
                    .build();
                container.provide_fn(&key, move || i as u64);
                key
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| black_box(container.request(&keys).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_lazy_optional(c: &mut Criterion) {
    let container = Container::new();
    let present = Key::<u64>::named("present");
    let absent = Key::<u64>::named("absent");
    container.provide_instance(&present, 7);

    let request = (present.lazy(), absent.optional());
    c.bench_function("lazy_optional", |b| {
        b.iter(|| black_box(container.request(&request).unwrap().1))
    });
}

criterion_group!(
    benches,
    benchmark_cached_singleton,
    benchmark_unscoped_chain,
    benchmark_fan_out,
    benchmark_lazy_optional
);
criterion_main!(benches);
