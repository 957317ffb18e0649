//! Table-driven non-linear hash
//!
//! Every input byte is substituted through a 256-entry table chosen by its
//! position modulo `LANES`, folded into a 64-bit state by rotate/xor, and
//! then pushed through an S-box keyed on the state's top byte. A final
//! tabulation pass over the eight state bytes spreads every input bit across
//! the digest. No multiplications are involved.
//!
//! Only the position relative to the start of the key matters, so a key
//! embedded in a larger buffer hashes exactly like a standalone copy.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::hash::HashFunction;

/// Number of per-position substitution tables
const LANES: usize = 8;

/// Seed for the built-in deterministic tables
const DEFAULT_SEED: u64 = 0x5143_a9e7_0b6d_21f3;

/// Returned in place of a zero digest
const ZERO_SUBSTITUTE: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Clone)]
struct Tables {
    init: u64,
    lanes: [[u64; 256]; LANES],
    sbox: [u64; 256],
    fold: [[u64; 256]; 8],
}

/// Tables shared by every deterministic instance
static DEFAULT_TABLES: Tables = Tables::from_seed(DEFAULT_SEED);

/// One splitmix64 step, returning the advanced state and its output.
const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    (state, z ^ (z >> 31))
}

impl Tables {
    const fn from_seed(seed: u64) -> Self {
        let (mut state, init) = splitmix64(seed);
        let mut next;

        let mut lanes = [[0u64; 256]; LANES];
        let mut lane = 0;
        while lane < LANES {
            let mut i = 0;
            while i < 256 {
                (state, next) = splitmix64(state);
                lanes[lane][i] = next;
                i += 1;
            }
            lane += 1;
        }

        let mut sbox = [0u64; 256];
        let mut i = 0;
        while i < 256 {
            (state, next) = splitmix64(state);
            sbox[i] = next;
            i += 1;
        }

        let mut fold = [[0u64; 256]; 8];
        let mut byte = 0;
        while byte < 8 {
            let mut i = 0;
            while i < 256 {
                (state, next) = splitmix64(state);
                fold[byte][i] = next;
                i += 1;
            }
            byte += 1;
        }

        Self {
            init,
            lanes,
            sbox,
            fold,
        }
    }

    fn from_entropy() -> Result<Box<Self>> {
        let mut tables = Box::new(Self {
            init: 0,
            lanes: [[0; 256]; LANES],
            sbox: [0; 256],
            fold: [[0; 256]; 8],
        });

        let mut init = [0u8; 8];
        getrandom::getrandom(&mut init).map_err(Error::Entropy)?;
        tables.init = u64::from_le_bytes(init);

        for table in tables
            .lanes
            .iter_mut()
            .chain(std::iter::once(&mut tables.sbox))
            .chain(tables.fold.iter_mut())
        {
            fill_random(table)?;
        }

        Ok(tables)
    }
}

fn fill_random(table: &mut [u64; 256]) -> Result<()> {
    let mut bytes = [0u8; 256 * 8];
    getrandom::getrandom(&mut bytes).map_err(Error::Entropy)?;
    for (entry, chunk) in table.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *entry = u64::from_le_bytes(word);
    }
    Ok(())
}

#[derive(Clone)]
enum TableSet {
    Fixed(&'static Tables),
    Random(Box<Tables>),
}

impl Deref for TableSet {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        match self {
            TableSet::Fixed(tables) => tables,
            TableSet::Random(tables) => tables,
        }
    }
}

/// How a [`NonLinearLookupTableHash`] obtains its tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashMode {
    /// Built-in tables; identical digests in every instance and process
    #[default]
    Deterministic,
    /// Fresh tables from OS entropy; digests differ per instance
    Randomized,
}

impl HashMode {
    /// Build a hash function in this mode
    pub fn build(self) -> Result<NonLinearLookupTableHash> {
        match self {
            HashMode::Deterministic => Ok(NonLinearLookupTableHash::new()),
            HashMode::Randomized => NonLinearLookupTableHash::randomized(),
        }
    }
}

impl fmt::Display for HashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashMode::Deterministic => write!(f, "deterministic"),
            HashMode::Randomized => write!(f, "randomized"),
        }
    }
}

impl FromStr for HashMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deterministic" => Ok(HashMode::Deterministic),
            "randomized" | "random" => Ok(HashMode::Randomized),
            other => Err(format!("unknown hash mode '{}'", other)),
        }
    }
}

/// Default [`HashFunction`]: non-linear lookup-table digest
///
/// ```
/// use slotcache::{HashFunction, NonLinearLookupTableHash};
///
/// let h = NonLinearLookupTableHash::new();
/// assert_eq!(h.hash(b"value"), h.hash_range(b"nvalue", 1, 5));
/// ```
#[derive(Clone)]
pub struct NonLinearLookupTableHash {
    tables: TableSet,
}

impl NonLinearLookupTableHash {
    /// Deterministic instance using the built-in tables
    pub fn new() -> Self {
        Self {
            tables: TableSet::Fixed(&DEFAULT_TABLES),
        }
    }

    /// Instance with tables drawn from OS entropy
    ///
    /// Use this when keys come from untrusted sources.
    pub fn randomized() -> Result<Self> {
        Ok(Self {
            tables: TableSet::Random(Tables::from_entropy()?),
        })
    }

    /// Mode this instance was created in
    pub fn mode(&self) -> HashMode {
        match self.tables {
            TableSet::Fixed(_) => HashMode::Deterministic,
            TableSet::Random(_) => HashMode::Randomized,
        }
    }

    fn digest(&self, bytes: &[u8]) -> u64 {
        let t = &*self.tables;

        let mut h = t.init ^ bytes.len() as u64;
        for (i, &b) in bytes.iter().enumerate() {
            h = h.rotate_left(7) ^ t.lanes[i % LANES][b as usize];
            h = h.wrapping_add(t.sbox[(h >> 56) as usize]);
        }

        let mut out = 0u64;
        for (i, &b) in h.to_le_bytes().iter().enumerate() {
            out = out.rotate_left(8) ^ t.fold[i][b as usize];
        }
        out ^= h;

        if out == 0 {
            ZERO_SUBSTITUTE
        } else {
            out
        }
    }
}

impl Default for NonLinearLookupTableHash {
    fn default() -> Self {
        Self::new()
    }
}

impl HashFunction for NonLinearLookupTableHash {
    #[inline]
    fn hash(&self, key: &[u8]) -> i64 {
        self.digest(key) as i64
    }

    #[inline]
    fn hash_range(&self, buf: &[u8], offset: usize, len: usize) -> i64 {
        self.digest(&buf[offset..offset + len]) as i64
    }
}

impl fmt::Debug for NonLinearLookupTableHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonLinearLookupTableHash")
            .field("mode", &self.mode())
            .finish()
    }
}
