//! Lock-free access from several threads
//!
//! Writers on disjoint slots must never lose each other's updates. Writers
//! sharing a slot may lose updates, but every read must still hand back a
//! value of the configured size.

use std::sync::{Arc, Barrier};
use std::thread;

use slotcache::{ConstantSizeCache, FnHash, HashFunction};

const THREADS: usize = 8;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_cache_is_send_sync() {
    assert_send_sync::<ConstantSizeCache>();
    assert_send_sync::<ConstantSizeCache<FnHash<fn(&[u8]) -> i64>>>();
}

fn first_byte(key: &[u8]) -> i64 {
    key[0] as i64
}

fn same_slot(_: &[u8]) -> i64 {
    0
}

#[test]
fn test_disjoint_slots_never_interfere() {
    let hash: FnHash<fn(&[u8]) -> i64> = FnHash(first_byte);
    let cache = Arc::new(
        ConstantSizeCache::with_hash_function(THREADS * 3 * (2 + 8), 2, 8, hash).unwrap(),
    );
    assert_eq!(cache.slot_count(), THREADS);

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..2_000u64 {
                    for j in 0..3u8 {
                        let value = (round * 10 + j as u64).to_le_bytes();
                        cache.put(&[t as u8, j + 1], &value).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..THREADS {
        for j in 0..3u8 {
            let expected = (1_999 * 10 + j as u64).to_le_bytes().to_vec();
            assert_eq!(cache.get(&[t as u8, j + 1]).unwrap(), Some(expected));
        }
    }
}

#[test]
fn test_shared_slot_stays_well_formed() {
    let hash: FnHash<fn(&[u8]) -> i64> = FnHash(same_slot);
    let cache = Arc::new(ConstantSizeCache::with_hash_function(3 * 16, 8, 8, hash).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..5_000u64 {
                    let key = (t as u64 * 1_000_000 + i % 7).to_le_bytes();
                    cache.put(&key, &i.to_le_bytes()).unwrap();
                    if let Some(value) = cache.get(&key).unwrap() {
                        assert_eq!(value.len(), 8);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Quiescent again: single-threaded semantics hold for fresh keys.
    let fresh: Vec<[u8; 8]> = (1..=4u64).map(|k| (u64::MAX - k).to_le_bytes()).collect();
    for key in &fresh {
        cache.put(key, key).unwrap();
    }
    assert_eq!(cache.get(&fresh[0]).unwrap(), None);
    for key in &fresh[1..] {
        assert_eq!(cache.get(key).unwrap(), Some(key.to_vec()));
    }
}

#[test]
fn test_hash_shared_across_threads() {
    let cache = Arc::new(ConstantSizeCache::new(1 << 16, 8, 8).unwrap());
    let expected = cache.hash_function().hash(b"shared!!");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.hash_function().hash(b"shared!!"))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
