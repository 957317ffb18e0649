//! # slotcache
//!
//! Fixed-layout cache for constant-size keys and values.
//!
//! ## Architecture
//! - **MemoryRegion**: one zero-filled off-heap allocation, released on drop
//! - **HashFunction**: pluggable key digest, `NonLinearLookupTableHash` by default
//! - **ConstantSizeCache**: 3-way set-associative slots, lock-free but lossy under contention
//!
//! ## Guarantees
//! - No allocation after construction on the `put` path for small slots
//! - The 3 most recently inserted distinct keys of a slot stay retrievable
//! - Errors for bad sizes and malformed input, never for lost entries

#![warn(missing_docs)]

mod builder;
mod cache;
mod error;
mod hash;
mod lookup_hash;
mod region;

pub use builder::CacheBuilder;
pub use cache::{ByteMap, ConstantSizeCache, ASSOCIATIVITY};
pub use error::{Error, Result};
pub use hash::{FnHash, HashFunction};
pub use lookup_hash::{HashMode, NonLinearLookupTableHash};
pub use region::{Backend, MemoryRegion};
