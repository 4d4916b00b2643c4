use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metabridge::{Class, ClassRegistry, KlassPool, MetadataHandle};
use rustc_hash::FxHashMap;

fn registry(count: usize) -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    for i in 0..count {
        registry.register_class(Class::new(0, format!("bench.Class{}", i), 1));
    }
    registry
}

fn bench_equality(c: &mut Criterion) {
    let registry = registry(2);
    let a = MetadataHandle::new(registry.mirror(0).unwrap());
    let b = MetadataHandle::new(registry.mirror(1).unwrap());

    c.bench_function("handle_eq_same", |bench| {
        bench.iter(|| black_box(a).equals(&black_box(a)));
    });
    c.bench_function("handle_eq_distinct", |bench| {
        bench.iter(|| black_box(a).equals(&black_box(b)));
    });
}

fn bench_map_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_insert");

    for count in [16usize, 256, 4096] {
        let registry = registry(count);
        let handles: Vec<_> = (0..count)
            .map(|i| MetadataHandle::new(registry.mirror(i).unwrap()))
            .collect();

        group.bench_with_input(BenchmarkId::new("fx_hash_map", count), &handles, |bench, handles| {
            bench.iter(|| {
                let mut map = FxHashMap::default();
                for (i, h) in handles.iter().enumerate() {
                    map.insert(*h, i);
                }
                black_box(map.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("klass_pool", count), &handles, |bench, handles| {
            bench.iter(|| {
                let mut pool = KlassPool::new();
                for h in handles {
                    pool.intern(*h);
                }
                black_box(pool.len())
            });
        });
    }

    group.finish();
}

fn bench_describe(c: &mut Criterion) {
    let registry = registry(1);
    let handle = MetadataHandle::new(registry.mirror(0).unwrap());

    c.bench_function("handle_describe", |bench| {
        bench.iter(|| black_box(handle).describe());
    });
}

criterion_group!(benches, bench_equality, bench_map_insert, bench_describe);
criterion_main!(benches);
