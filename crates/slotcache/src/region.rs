//! Off-heap memory region
//!
//! A `MemoryRegion` owns exactly one zero-filled allocation of a fixed size.
//! Two backends can supply it:
//! - `Backend::Anonymous`: a private anonymous mapping (memmap2), never touching the heap
//! - `Backend::System`: `std::alloc::alloc_zeroed` with word alignment
//!
//! Shared access goes through `&[AtomicU8]` with relaxed loads and stores. That
//! keeps racing byte copies defined without adding any ordering between callers;
//! nothing here synchronizes, and concurrent writers to the same range simply race.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::{self, NonNull};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::error::{Error, Result};

/// Source of the raw bytes behind a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// Private anonymous memory mapping
    #[default]
    Anonymous,
    /// Global system allocator
    System,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Anonymous => write!(f, "anonymous"),
            Backend::System => write!(f, "system"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" | "mmap" => Ok(Backend::Anonymous),
            "system" | "heap" => Ok(Backend::System),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

enum Allocation {
    // Held only to unmap on drop; all access goes through `MemoryRegion::ptr`.
    Anonymous(#[allow(dead_code)] MmapMut),
    System(Layout),
}

/// Fixed-size, zero-initialized block of raw memory
pub struct MemoryRegion {
    ptr: NonNull<u8>,
    len: usize,
    allocation: Allocation,
}

// SAFETY: the region owns its allocation outright, and every shared access
// goes through `AtomicU8` cells, so handing it to or sharing it between
// threads cannot produce a data race.
unsafe impl Send for MemoryRegion {}
unsafe impl Sync for MemoryRegion {}

impl MemoryRegion {
    /// Allocate `size` zeroed bytes from the given backend
    ///
    /// # Arguments
    /// * `size` - Region size in bytes, must be non-zero
    /// * `backend` - Where the memory comes from
    ///
    /// # Returns
    /// * `Result<MemoryRegion>` - Resource error if the memory cannot be obtained
    pub fn allocate(size: usize, backend: Backend) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocLayout(size));
        }

        let (ptr, allocation) = match backend {
            Backend::Anonymous => {
                // Anonymous mappings are zero-filled by the kernel.
                let mut map = MmapOptions::new().len(size).map_anon()?;
                let ptr = NonNull::new(map.as_mut_ptr()).ok_or(Error::AllocLayout(size))?;
                (ptr, Allocation::Anonymous(map))
            }
            Backend::System => {
                let layout = Layout::from_size_align(size, std::mem::align_of::<u64>())
                    .map_err(|_| Error::AllocLayout(size))?;
                // SAFETY: layout has non-zero size.
                let raw = unsafe { alloc::alloc_zeroed(layout) };
                let ptr = NonNull::new(raw).ok_or(Error::AllocLayout(size))?;
                (ptr, Allocation::System(layout))
            }
        };

        debug!(size, %backend, "allocated memory region");

        Ok(Self {
            ptr,
            len: size,
            allocation,
        })
    }

    /// Region size in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: regions are never empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backend the region was allocated from
    pub fn backend(&self) -> Backend {
        match self.allocation {
            Allocation::Anonymous(_) => Backend::Anonymous,
            Allocation::System(_) => Backend::System,
        }
    }

    #[inline]
    fn cells(&self) -> &[AtomicU8] {
        // SAFETY: `ptr` is valid for `len` bytes for as long as `self` lives,
        // `AtomicU8` has the layout of `u8`, and no non-atomic reference to
        // the bytes is ever handed out while shared borrows exist.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<AtomicU8>(), self.len) }
    }

    /// Copy `out.len()` bytes starting at `offset` into `out`
    ///
    /// The copy is a snapshot: later writes to the region do not show through.
    ///
    /// # Panics
    /// Panics if the range runs past the end of the region.
    #[inline]
    pub fn read_into(&self, offset: usize, out: &mut [u8]) {
        let src = &self.cells()[offset..offset + out.len()];
        for (dst, cell) in out.iter_mut().zip(src) {
            *dst = cell.load(Ordering::Relaxed);
        }
    }

    /// Snapshot `len` bytes starting at `offset`
    ///
    /// # Panics
    /// Panics if the range runs past the end of the region.
    pub fn read_range(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.read_into(offset, &mut out);
        out
    }

    /// Copy `bytes` into the region at `offset`
    ///
    /// # Panics
    /// Panics if the range runs past the end of the region.
    #[inline]
    pub fn write_range(&self, offset: usize, bytes: &[u8]) {
        let dst = &self.cells()[offset..offset + bytes.len()];
        for (cell, &byte) in dst.iter().zip(bytes) {
            cell.store(byte, Ordering::Relaxed);
        }
    }

    /// Reset every byte to zero
    pub fn zero(&mut self) {
        // SAFETY: `&mut self` rules out concurrent access; `ptr` is valid for `len` bytes.
        unsafe { ptr::write_bytes(self.ptr.as_ptr(), 0, self.len) };
    }

    /// Return the memory to its backend
    ///
    /// Equivalent to dropping the region; spelled out for call sites that
    /// want the release to be visible.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        if let Allocation::System(layout) = self.allocation {
            // SAFETY: `ptr` came from `alloc_zeroed` with this exact layout and
            // drop runs once.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
        // Anonymous mappings are unmapped when the `MmapMut` field drops.
        debug!(size = self.len, backend = %self.backend(), "released memory region");
    }
}

impl fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("len", &self.len)
            .field("backend", &self.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKENDS: [Backend; 2] = [Backend::Anonymous, Backend::System];

    #[test]
    fn test_zero_initialized() {
        for backend in BACKENDS {
            let region = MemoryRegion::allocate(10_000, backend).unwrap();
            assert_eq!(region.len(), 10_000);
            assert_eq!(region.backend(), backend);
            assert!(region.read_range(0, 10_000).iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_write_and_read() {
        for backend in BACKENDS {
            let region = MemoryRegion::allocate(64, backend).unwrap();
            region.write_range(10, b"hello");

            assert_eq!(region.read_range(10, 5), b"hello");
            assert_eq!(region.read_range(8, 9), b"\0\0hello\0\0");

            let mut out = [0u8; 3];
            region.read_into(11, &mut out);
            assert_eq!(&out, b"ell");
        }
    }

    #[test]
    fn test_read_is_snapshot() {
        let region = MemoryRegion::allocate(16, Backend::default()).unwrap();
        region.write_range(0, &[7; 4]);

        let snapshot = region.read_range(0, 4);
        region.write_range(0, &[9; 4]);

        assert_eq!(snapshot, vec![7; 4]);
        assert_eq!(region.read_range(0, 4), vec![9; 4]);
    }

    #[test]
    fn test_zero() {
        let mut region = MemoryRegion::allocate(32, Backend::System).unwrap();
        region.write_range(0, &[0xff; 32]);
        region.zero();
        assert_eq!(region.read_range(0, 32), vec![0; 32]);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = MemoryRegion::allocate(0, Backend::System).unwrap_err();
        assert!(err.is_resource());
    }

    #[test]
    fn test_huge_allocation_fails() {
        let err = MemoryRegion::allocate(usize::MAX, Backend::System).unwrap_err();
        assert!(err.is_resource());
    }

    #[test]
    #[should_panic]
    fn test_write_out_of_bounds() {
        let region = MemoryRegion::allocate(8, Backend::Anonymous).unwrap();
        region.write_range(6, b"abc");
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("mmap".parse::<Backend>(), Ok(Backend::Anonymous));
        assert_eq!("System".parse::<Backend>(), Ok(Backend::System));
        assert!("gpu".parse::<Backend>().is_err());
        assert_eq!(Backend::System.to_string(), "system");
    }

    #[test]
    fn test_release() {
        let region = MemoryRegion::allocate(4096, Backend::Anonymous).unwrap();
        region.write_range(0, b"x");
        region.release();
    }
}
