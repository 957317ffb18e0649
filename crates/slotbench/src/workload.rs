//! Synthetic key space and per-thread op loop

use slotcache::{ConstantSizeCache, HashFunction};

use crate::stats::BenchStats;

/// Deterministic key and value material derived from an index
#[derive(Debug, Clone, Copy)]
pub struct KeySpace {
    pub keys: u64,
    pub key_size: usize,
    pub value_size: usize,
    pub seed: u64,
}

/// xorshift64*, enough for picking keys and op kinds
#[derive(Debug, Clone)]
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl KeySpace {
    /// Fill `out` with the bytes of key `index`
    pub fn key(&self, index: u64, out: &mut [u8]) {
        fill(self.seed ^ index, out);
        // Keep keys away from the all-zero pattern of unset pairs.
        if out.iter().all(|&b| b == 0) {
            out[0] = 1;
        }
    }

    /// Fill `out` with the value every writer stores for key `index`
    pub fn value(&self, index: u64, out: &mut [u8]) {
        fill(!(self.seed ^ index), out);
    }
}

fn fill(mut state: u64, out: &mut [u8]) {
    for chunk in out.chunks_mut(8) {
        state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        chunk.copy_from_slice(&z.to_le_bytes()[..chunk.len()]);
    }
}

/// Run `ops` operations against the cache
///
/// Reads that miss fill the key back in, the way a read-through cache is
/// used. Writes store the key's canonical value.
pub fn run<H: HashFunction>(
    cache: &ConstantSizeCache<H>,
    space: &KeySpace,
    stats: &BenchStats,
    ops: u64,
    read_ratio: f64,
    rng: &mut Rng,
) -> slotcache::Result<()> {
    let mut key = vec![0u8; space.key_size];
    let mut expected = vec![0u8; space.value_size];
    let mut found = vec![0u8; space.value_size];

    for _ in 0..ops {
        let index = rng.next_u64() % space.keys;
        space.key(index, &mut key);
        space.value(index, &mut expected);

        if rng.next_f64() < read_ratio {
            if cache.get_into(&key, &mut found)? {
                if found == expected {
                    stats.record_hit();
                } else {
                    stats.record_torn();
                }
                continue;
            }
            stats.record_miss();
        }

        cache.put(&key, &expected)?;
        stats.record_put();
    }

    Ok(())
}
