use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use slotcache::{ConstantSizeCache, HashFunction, NonLinearLookupTableHash};

const REGION: usize = 64 * 1024 * 1024;

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_16b_key_32b_value", |b| {
        let cache = ConstantSizeCache::new(REGION, 16, 32).unwrap();
        let value = [0x5au8; 32];
        let mut counter = 0u128;

        b.iter(|| {
            cache.put(&counter.to_le_bytes(), &value).unwrap();
            counter += 1;
        });
    });

    group.bench_function("update_in_place", |b| {
        let cache = ConstantSizeCache::new(REGION, 16, 32).unwrap();
        let key = [7u8; 16];
        let value = [0x5au8; 32];
        cache.put(&key, &value).unwrap();

        b.iter(|| {
            cache.put(black_box(&key), &value).unwrap();
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_hit", |b| {
        let cache = ConstantSizeCache::new(REGION, 16, 32).unwrap();
        let value = [0x5au8; 32];

        // Pre-populate
        for i in 0..10_000u128 {
            cache.put(&i.to_le_bytes(), &value).unwrap();
        }

        let mut out = [0u8; 32];
        let mut counter = 0u128;
        b.iter(|| {
            black_box(cache.get_into(&(counter % 10_000).to_le_bytes(), &mut out).unwrap());
            counter += 1;
        });
    });

    group.bench_function("get_miss", |b| {
        let cache = ConstantSizeCache::new(REGION, 16, 32).unwrap();
        let mut counter = 1u128;

        b.iter(|| {
            black_box(cache.get(&counter.to_le_bytes()).unwrap());
            counter += 1;
        });
    });

    group.finish();
}

fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");
    group.sample_size(50);

    let hash = NonLinearLookupTableHash::new();
    for len in [8usize, 32, 256] {
        let key = vec![0xa5u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function(format!("lookup_table_{}b", len), |b| {
            b.iter(|| black_box(hash.hash(black_box(&key))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_hash);
criterion_main!(benches);
