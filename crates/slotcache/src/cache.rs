//! ConstantSizeCache: set-associative table of fixed-size pairs
//!
//! Layout of the region:
//! ```text
//! | slot 0                        | slot 1                        | ... | tail |
//! | key|value key|value key|value | key|value key|value key|value | ... |      |
//!   newest ------------> oldest
//! ```
//! A key lives in slot `|hash(key)| % slot_count`. Bytes past the last full
//! slot are never touched.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::hash::HashFunction;
use crate::lookup_hash::NonLinearLookupTableHash;
use crate::region::{Backend, MemoryRegion};

/// Number of key/value pairs held by one slot
pub const ASSOCIATIVITY: usize = 3;

/// Slots up to this size are snapshotted on the stack
const STACK_SLOT_SIZE: usize = 384;

/// Byte-keyed map contract shared by cache implementations
pub trait ByteMap {
    /// Store `value` under `key`
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Copy of the value stored under `key`, if any
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Hash table cache for constant-length keys and values
///
/// All memory is allocated up front in a single off-heap [`MemoryRegion`] of
/// `total_size` bytes. The region is split into `slot_count` slots of
/// [`ASSOCIATIVITY`] key/value pairs each. Inserting a new key into a full
/// slot evicts the least recently *inserted* pair; updating an existing key
/// rewrites its value without reordering, and reads never reorder.
///
/// # Zero keys
///
/// The region starts zero-filled, so an all-zero key matches every slot that
/// has not yet been fully populated and reads back an all-zero value. Avoid
/// all-zero keys if "absent" and "zero" must be told apart.
///
/// # Concurrency
///
/// `put` and `get` take `&self` and never lock. `put` snapshots the slot,
/// edits the snapshot and writes the whole slot back, so two writers hitting
/// the same slot at the same time may lose one of their updates, and a reader
/// racing a writer may see a slot that mixes both states. Writers on different
/// slots never interfere. Since a cache may drop entries anyway through hash
/// collisions, this trade-off suits typical cache use but not a system of record.
///
/// ```
/// use slotcache::ConstantSizeCache;
///
/// let cache = ConstantSizeCache::new(4096, 4, 8).unwrap();
/// cache.put(b"key1", b"value001").unwrap();
/// assert_eq!(cache.get(b"key1").unwrap(), Some(b"value001".to_vec()));
/// assert_eq!(cache.get(b"key2").unwrap(), None);
/// ```
pub struct ConstantSizeCache<H = NonLinearLookupTableHash> {
    region: MemoryRegion,
    hash: H,
    key_size: usize,
    value_size: usize,
    pair_size: usize,
    slot_size: usize,
    slot_count: usize,
}

impl ConstantSizeCache<NonLinearLookupTableHash> {
    /// Create a cache using the deterministic default hash
    ///
    /// # Arguments
    /// * `total_size` - Bytes of off-heap memory to allocate
    /// * `key_size` - Exact length of every key, at least 1
    /// * `value_size` - Exact length of every value, at least 1
    ///
    /// # Returns
    /// * `Result<ConstantSizeCache>` - Configuration or resource error on failure
    pub fn new(total_size: usize, key_size: usize, value_size: usize) -> Result<Self> {
        Self::with_hash_function(total_size, key_size, value_size, NonLinearLookupTableHash::new())
    }
}

impl<H: HashFunction> ConstantSizeCache<H> {
    /// Create a cache with a caller-supplied hash function
    pub fn with_hash_function(
        total_size: usize,
        key_size: usize,
        value_size: usize,
        hash: H,
    ) -> Result<Self> {
        Self::from_parts(total_size, key_size, value_size, Some(hash), Backend::default())
    }

    pub(crate) fn from_parts(
        total_size: usize,
        key_size: usize,
        value_size: usize,
        hash: Option<H>,
        backend: Backend,
    ) -> Result<Self> {
        let geometry = validate(total_size, key_size, value_size).and_then(|slot_size| {
            hash.map(|hash| (slot_size, hash))
                .ok_or(Error::MissingHashFunction)
        });

        let (slot_size, hash) = match geometry {
            Ok(parts) => parts,
            Err(err) => {
                warn!(total_size, key_size, value_size, %err, "rejected cache configuration");
                return Err(err);
            }
        };

        let region = MemoryRegion::allocate(total_size, backend)?;
        let slot_count = total_size / slot_size;

        debug!(
            total_size,
            key_size,
            value_size,
            slot_size,
            slot_count,
            "created constant size cache"
        );

        Ok(Self {
            region,
            hash,
            key_size,
            value_size,
            pair_size: key_size + value_size,
            slot_size,
            slot_count,
        })
    }

    /// Store `value` under `key`
    ///
    /// A key already present in its slot gets its value overwritten in place.
    /// Otherwise the pair goes to the front of the slot and the oldest pair is
    /// dropped.
    ///
    /// # Errors
    /// Input error if `key` or `value` has the wrong length; the cache is left untouched.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_key(key)?;
        if value.len() != self.value_size {
            return Err(Error::ValueLength {
                actual: value.len(),
                expected: self.value_size,
            });
        }

        let slot = self.slot_index(key);
        let offset = slot * self.slot_size;

        self.with_snapshot(offset, |snapshot| {
            match self.position_of(key, snapshot) {
                Some(pos) => {
                    // No reordering on update.
                    let start = pos * self.pair_size + self.key_size;
                    snapshot[start..start + self.value_size].copy_from_slice(value);
                    trace!(slot, pos, "updated entry in place");
                }
                None => {
                    snapshot.copy_within(0..(ASSOCIATIVITY - 1) * self.pair_size, self.pair_size);
                    snapshot[..self.key_size].copy_from_slice(key);
                    snapshot[self.key_size..self.pair_size].copy_from_slice(value);
                    trace!(slot, "inserted entry at slot front");
                }
            }
            self.region.write_range(offset, snapshot);
        });

        Ok(())
    }

    /// Copy of the value stored under `key`
    ///
    /// # Errors
    /// Input error if `key` has the wrong length.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_key(key)?;

        let offset = self.slot_index(key) * self.slot_size;
        let value = self.with_snapshot(offset, |snapshot| {
            self.position_of(key, snapshot).map(|pos| {
                let start = pos * self.pair_size + self.key_size;
                snapshot[start..start + self.value_size].to_vec()
            })
        });

        Ok(value)
    }

    /// Copy the value stored under `key` into `out` without allocating
    ///
    /// # Returns
    /// * `Result<bool>` - Whether the key was found; `out` is untouched when it wasn't
    ///
    /// # Errors
    /// Input error if `key` or `out` has the wrong length.
    pub fn get_into(&self, key: &[u8], out: &mut [u8]) -> Result<bool> {
        self.check_key(key)?;
        if out.len() != self.value_size {
            return Err(Error::ValueLength {
                actual: out.len(),
                expected: self.value_size,
            });
        }

        let offset = self.slot_index(key) * self.slot_size;
        let found = self.with_snapshot(offset, |snapshot| {
            match self.position_of(key, snapshot) {
                Some(pos) => {
                    let start = pos * self.pair_size + self.key_size;
                    out.copy_from_slice(&snapshot[start..start + self.value_size]);
                    true
                }
                None => false,
            }
        });

        Ok(found)
    }

    /// Check whether `key` is currently stored
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        let offset = self.slot_index(key) * self.slot_size;
        Ok(self.with_snapshot(offset, |snapshot| self.position_of(key, snapshot).is_some()))
    }

    /// Forget every entry by zeroing the whole region
    pub fn clear(&mut self) {
        self.region.zero();
        debug!(total_size = self.region.len(), "cleared constant size cache");
    }

    /// Configured key length in bytes
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Configured value length in bytes
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Size of the backing region in bytes
    pub fn total_size(&self) -> usize {
        self.region.len()
    }

    /// Bytes per slot
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots in the region
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Pairs per slot
    pub fn associativity(&self) -> usize {
        ASSOCIATIVITY
    }

    /// Upper bound on the number of entries held at once
    pub fn capacity(&self) -> usize {
        self.slot_count * ASSOCIATIVITY
    }

    /// Hash function used for slot addressing
    pub fn hash_function(&self) -> &H {
        &self.hash
    }

    /// Backend the region was allocated from
    pub fn backend(&self) -> Backend {
        self.region.backend()
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.key_size {
            return Err(Error::KeyLength {
                actual: key.len(),
                expected: self.key_size,
            });
        }
        Ok(())
    }

    #[inline]
    fn slot_index(&self, key: &[u8]) -> usize {
        let digest = self.hash.hash(key).unsigned_abs();
        (digest % self.slot_count as u64) as usize
    }

    #[inline]
    fn position_of(&self, key: &[u8], snapshot: &[u8]) -> Option<usize> {
        (0..ASSOCIATIVITY).find(|&pos| {
            let start = pos * self.pair_size;
            &snapshot[start..start + self.key_size] == key
        })
    }

    /// Read the slot at `offset` into a scratch buffer and hand it to `f`
    #[inline]
    fn with_snapshot<R>(&self, offset: usize, f: impl FnOnce(&mut [u8]) -> R) -> R {
        if self.slot_size <= STACK_SLOT_SIZE {
            let mut buf = [0u8; STACK_SLOT_SIZE];
            let snapshot = &mut buf[..self.slot_size];
            self.region.read_into(offset, snapshot);
            f(snapshot)
        } else {
            let mut snapshot = vec![0u8; self.slot_size];
            self.region.read_into(offset, &mut snapshot);
            f(&mut snapshot)
        }
    }
}

/// Returns the slot size for a valid configuration
fn validate(total_size: usize, key_size: usize, value_size: usize) -> Result<usize> {
    if key_size < 1 {
        return Err(Error::InvalidKeySize(key_size));
    }
    if value_size < 1 {
        return Err(Error::InvalidValueSize(value_size));
    }

    let slot_size = key_size
        .checked_add(value_size)
        .and_then(|pair| pair.checked_mul(ASSOCIATIVITY))
        .ok_or(Error::SizeOverflow)?;

    if total_size < slot_size {
        return Err(Error::RegionTooSmall {
            size: total_size,
            min: slot_size,
        });
    }

    Ok(slot_size)
}

impl<H: HashFunction> ByteMap for ConstantSizeCache<H> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ConstantSizeCache::put(self, key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        ConstantSizeCache::get(self, key)
    }
}

impl<H> fmt::Debug for ConstantSizeCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantSizeCache")
            .field("key_size", &self.key_size)
            .field("value_size", &self.value_size)
            .field("slot_size", &self.slot_size)
            .field("slot_count", &self.slot_count)
            .field("region", &self.region)
            .finish()
    }
}
