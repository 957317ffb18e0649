//! Pluggable key hashing

use std::fmt;
use std::sync::Arc;

/// Maps a byte key to a 64-bit digest
///
/// Implementations must be positionally independent: hashing
/// `buf[offset..offset + len]` through [`hash_range`](Self::hash_range) yields
/// the same digest as hashing an owned copy of those bytes through
/// [`hash`](Self::hash). Digests of zero should be rare for real keys.
pub trait HashFunction {
    /// Digest a whole key
    fn hash(&self, key: &[u8]) -> i64;

    /// Digest `len` bytes of `buf` starting at `offset`
    ///
    /// # Panics
    /// Panics if the range runs past the end of `buf`.
    fn hash_range(&self, buf: &[u8], offset: usize, len: usize) -> i64 {
        self.hash(&buf[offset..offset + len])
    }
}

impl<H: HashFunction + ?Sized> HashFunction for &H {
    fn hash(&self, key: &[u8]) -> i64 {
        (**self).hash(key)
    }

    fn hash_range(&self, buf: &[u8], offset: usize, len: usize) -> i64 {
        (**self).hash_range(buf, offset, len)
    }
}

impl<H: HashFunction + ?Sized> HashFunction for Box<H> {
    fn hash(&self, key: &[u8]) -> i64 {
        (**self).hash(key)
    }

    fn hash_range(&self, buf: &[u8], offset: usize, len: usize) -> i64 {
        (**self).hash_range(buf, offset, len)
    }
}

impl<H: HashFunction + ?Sized> HashFunction for Arc<H> {
    fn hash(&self, key: &[u8]) -> i64 {
        (**self).hash(key)
    }

    fn hash_range(&self, buf: &[u8], offset: usize, len: usize) -> i64 {
        (**self).hash_range(buf, offset, len)
    }
}

/// Adapts a closure into a [`HashFunction`]
///
/// ```
/// use slotcache::{FnHash, HashFunction};
///
/// let always_zero = FnHash(|_: &[u8]| 0i64);
/// assert_eq!(always_zero.hash(b"anything"), 0);
/// ```
#[derive(Clone, Copy)]
pub struct FnHash<F>(pub F);

impl<F> HashFunction for FnHash<F>
where
    F: Fn(&[u8]) -> i64,
{
    fn hash(&self, key: &[u8]) -> i64 {
        (self.0)(key)
    }
}

impl<F> fmt::Debug for FnHash<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHash")
    }
}
