#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_CONST1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_CONST2: u64 = 0x94D0_49BB_1331_11EB;
pub const DEFAULT_RNG_SEED: u64 = 0xC0DE_CAFE_F00D_BAAD;

pub const RANDOM_REASON_CODES: [&str; 2] = ["random_upper_bound_rejected", "random_range_inverted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomError {
    InvalidUpperBound,
    InvertedRange,
}

impl RandomError {
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::InvalidUpperBound => "random_upper_bound_rejected",
            Self::InvertedRange => "random_range_inverted",
        }
    }
}

impl std::fmt::Display for RandomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUpperBound => write!(f, "upper_bound must be > 0"),
            Self::InvertedRange => write!(f, "range low bound exceeds high bound"),
        }
    }
}

impl std::error::Error for RandomError {}

/// Counter-based splitmix64 stream. A fresh stream depends only on its seed, so any
/// trial can be replayed from its recorded seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicRng {
    stream_seed: u64,
    counter: u64,
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            stream_seed: seed,
            counter: 0,
        }
    }

    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        splitmix64(
            self.stream_seed
                .wrapping_add(self.counter.wrapping_mul(GOLDEN_GAMMA)),
        )
    }

    pub fn bounded_u64(&mut self, upper_bound: u64) -> Result<u64, RandomError> {
        if upper_bound == 0 {
            return Err(RandomError::InvalidUpperBound);
        }

        let threshold = u64::MAX - u64::MAX % upper_bound;

        loop {
            let candidate = self.next_u64();
            if candidate < threshold {
                return Ok(candidate % upper_bound);
            }
        }
    }

    /// Uniform draw from `low..=high`.
    pub fn uniform_i64(&mut self, low: i64, high: i64) -> Result<i64, RandomError> {
        if low > high {
            return Err(RandomError::InvertedRange);
        }
        let span = high.abs_diff(low);
        let offset = if span == u64::MAX {
            self.next_u64()
        } else {
            self.bounded_u64(span + 1)?
        };
        Ok(low.wrapping_add_unsigned(offset))
    }

    /// Uniform draw from `low..=high`.
    pub fn uniform_usize(&mut self, low: usize, high: usize) -> Result<usize, RandomError> {
        if low > high {
            return Err(RandomError::InvertedRange);
        }
        let span = u64::try_from(high - low).map_err(|_| RandomError::InvalidUpperBound)?;
        let offset = if span == u64::MAX {
            self.next_u64()
        } else {
            self.bounded_u64(span + 1)?
        };
        let offset = usize::try_from(offset).map_err(|_| RandomError::InvalidUpperBound)?;
        Ok(low + offset)
    }

    pub fn fill_i64(&mut self, len: usize, low: i64, high: i64) -> Result<Vec<i64>, RandomError> {
        (0..len).map(|_| self.uniform_i64(low, high)).collect()
    }

    /// Independent child stream, used to give every trial its own replayable seed.
    #[must_use]
    pub fn fork_seed(&mut self) -> u64 {
        splitmix64(self.next_u64() ^ GOLDEN_GAMMA)
    }
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(DEFAULT_RNG_SEED)
    }
}

/// Seed drawn from wall-clock time and the process id, for runs that do not pin a
/// seed.
#[must_use]
pub fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let folded = (nanos as u64) ^ ((nanos >> 64) as u64);
    splitmix64(folded ^ u64::from(std::process::id()).wrapping_mul(GOLDEN_GAMMA))
}

fn splitmix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(MIX_CONST1);
    x ^= x >> 27;
    x = x.wrapping_mul(MIX_CONST2);
    x ^ (x >> 31)
}
