//! Allocation and collection throughput.
//!
//! Run with: cargo bench --bench collector

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hummingbird_heap::{Heap, Value};

fn bench_interning(c: &mut Criterion) {
    let mut group = c.benchmark_group("interning");

    for count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("copy_string", count), &count, |b, &count| {
            b.iter(|| {
                let mut heap = Heap::default();
                let mut roots: Vec<Value> = Vec::with_capacity(count);
                for index in 0..count {
                    let string = heap.copy_string(&roots, &format!("s{}", index % 64)).unwrap();
                    roots.push(string.into());
                }
                black_box(heap.string_count())
            });
        });
    }

    group.finish();
}

fn bench_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection");

    for live in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("mark_lists", live), &live, |b, &live| {
            let mut heap = Heap::default();
            let mut roots: Vec<Value> = Vec::with_capacity(live);
            for _ in 0..live {
                let list = heap.new_list(&roots).unwrap();
                roots.push(list.into());
            }
            b.iter(|| black_box(heap.collect(&roots)));
        });

        group.bench_with_input(BenchmarkId::new("sweep_garbage", live), &live, |b, &live| {
            b.iter(|| {
                let mut heap = Heap::default();
                for _ in 0..live {
                    heap.new_list(&()).unwrap();
                }
                black_box(heap.collect(&()))
            });
        });
    }

    group.finish();
}

fn bench_instances(c: &mut Criterion) {
    c.bench_function("instance_fields", |b| {
        b.iter(|| {
            let mut heap = Heap::default();
            let mut roots: Vec<Value> = vec![];
            let name = heap.copy_string(&roots, "Point").unwrap();
            roots.push(name.into());
            let class = heap.new_class(&roots, name).unwrap();
            roots.push(class.into());
            for index in 0..256 {
                let instance = heap.new_instance(&roots, class).unwrap();
                roots.push(instance.into());
                let field = heap.copy_string(&roots, &format!("f{}", index % 8)).unwrap();
                heap.set_field(&roots, instance, field, Value::Number(index as f64))
                    .unwrap();
            }
            black_box(heap.collect(&roots))
        });
    });
}

criterion_group!(benches, bench_interning, bench_collection, bench_instances);
criterion_main!(benches);
