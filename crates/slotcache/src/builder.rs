//! Cache configuration
//!
//! ```
//! use slotcache::{Backend, CacheBuilder, HashMode};
//!
//! let cache = CacheBuilder::new(1 << 20, 16, 8)
//!     .backend(Backend::System)
//!     .hash_mode(HashMode::Randomized)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(cache.key_size(), 16);
//! ```

use crate::cache::ConstantSizeCache;
use crate::error::{Error, Result};
use crate::hash::HashFunction;
use crate::lookup_hash::{HashMode, NonLinearLookupTableHash};
use crate::region::Backend;

/// Collects cache parameters and validates them in [`build`](Self::build)
///
/// [`CacheBuilder::new`] starts from the deterministic default hash.
/// [`CacheBuilder::default`] starts empty: every size and the hash function
/// must be set before `build` succeeds.
#[derive(Debug, Clone)]
pub struct CacheBuilder<H = NonLinearLookupTableHash> {
    total_size: Option<usize>,
    key_size: Option<usize>,
    value_size: Option<usize>,
    hash_function: Option<H>,
    backend: Backend,
}

impl Default for CacheBuilder<NonLinearLookupTableHash> {
    fn default() -> Self {
        Self {
            total_size: None,
            key_size: None,
            value_size: None,
            hash_function: None,
            backend: Backend::default(),
        }
    }
}

impl CacheBuilder<NonLinearLookupTableHash> {
    /// Builder with all sizes set and the deterministic default hash
    pub fn new(total_size: usize, key_size: usize, value_size: usize) -> Self {
        Self {
            total_size: Some(total_size),
            key_size: Some(key_size),
            value_size: Some(value_size),
            hash_function: Some(NonLinearLookupTableHash::new()),
            backend: Backend::default(),
        }
    }
}

impl<H> CacheBuilder<H> {
    /// Region size in bytes
    pub fn total_size(mut self, total_size: usize) -> Self {
        self.total_size = Some(total_size);
        self
    }

    /// Key length in bytes
    pub fn key_size(mut self, key_size: usize) -> Self {
        self.key_size = Some(key_size);
        self
    }

    /// Value length in bytes
    pub fn value_size(mut self, value_size: usize) -> Self {
        self.value_size = Some(value_size);
        self
    }

    /// Where the region memory comes from
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Use a caller-supplied hash function
    pub fn hash_function<G>(self, hash_function: G) -> CacheBuilder<G> {
        CacheBuilder {
            total_size: self.total_size,
            key_size: self.key_size,
            value_size: self.value_size,
            hash_function: Some(hash_function),
            backend: self.backend,
        }
    }

    /// Use a [`NonLinearLookupTableHash`] in the given mode
    ///
    /// # Errors
    /// Resource error if randomized tables cannot be seeded.
    pub fn hash_mode(self, mode: HashMode) -> Result<CacheBuilder<NonLinearLookupTableHash>> {
        Ok(self.hash_function(mode.build()?))
    }
}

impl<H: HashFunction> CacheBuilder<H> {
    /// Validate the parameters and allocate the cache
    pub fn build(self) -> Result<ConstantSizeCache<H>> {
        let total_size = self.total_size.ok_or(Error::MissingParameter("total_size"))?;
        let key_size = self.key_size.ok_or(Error::MissingParameter("key_size"))?;
        let value_size = self.value_size.ok_or(Error::MissingParameter("value_size"))?;

        ConstantSizeCache::from_parts(
            total_size,
            key_size,
            value_size,
            self.hash_function,
            self.backend,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::FnHash;

    #[test]
    fn test_build_defaults() {
        let cache = CacheBuilder::new(1024, 4, 4).build().unwrap();
        assert_eq!(cache.backend(), Backend::Anonymous);
        assert_eq!(cache.hash_function().mode(), HashMode::Deterministic);
    }

    #[test]
    fn test_missing_hash_function() {
        let err = CacheBuilder::default()
            .total_size(1024)
            .key_size(4)
            .value_size(4)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingHashFunction));
        assert!(err.is_config());
    }

    #[test]
    fn test_size_checked_before_hash() {
        let err = CacheBuilder::default()
            .total_size(2)
            .key_size(1)
            .value_size(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::RegionTooSmall { size: 2, min: 6 }));
    }

    #[test]
    fn test_missing_parameter() {
        let err = CacheBuilder::default()
            .key_size(4)
            .value_size(4)
            .hash_function(NonLinearLookupTableHash::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter("total_size")));
    }

    #[test]
    fn test_custom_hash_and_backend() {
        let cache = CacheBuilder::default()
            .total_size(60)
            .key_size(1)
            .value_size(1)
            .backend(Backend::System)
            .hash_function(FnHash(|_: &[u8]| 0i64))
            .build()
            .unwrap();

        assert_eq!(cache.backend(), Backend::System);
        for k in 1..=4u8 {
            cache.put(&[k], &[k]).unwrap();
        }
        assert_eq!(cache.get(&[1]).unwrap(), None);
        assert_eq!(cache.get(&[4]).unwrap(), Some(vec![4]));
    }

    #[test]
    fn test_randomized_mode() {
        let cache = CacheBuilder::new(4096, 8, 8)
            .hash_mode(HashMode::Randomized)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(cache.hash_function().mode(), HashMode::Randomized);

        cache.put(b"abcdefgh", b"12345678").unwrap();
        assert_eq!(cache.get(b"abcdefgh").unwrap(), Some(b"12345678".to_vec()));
    }
}
