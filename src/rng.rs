//! Episode-scoped deterministic RNG for food placement and spawning.
//!
//! The generator is owned by a `BoardState` lineage: the ruleset clones it
//! out of the incoming state, draws from it, and stores the advanced copy in
//! the next state. Nothing else advances it, so a seed plus a move sequence
//! reproduces an episode exactly, and independent episodes never share state.
//!
//! Serialized form is `{seed, word_pos}`; restoring it resumes the exact
//! stream position.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic ChaCha8 stream tied to one episode seed
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RngState", into = "RngState")]
pub struct FoodRng {
    inner: ChaCha8Rng,
    seed: u64,
}

/// Serialized position of a `FoodRng`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    /// Stream position in 32-bit words, as reported by ChaCha
    pub word_pos: u128,
}

impl FoodRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        FoodRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed drawn from the OS, used when a reset does not specify one.
    /// The seed is recorded in the state so the episode stays replayable.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> RngState {
        RngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.inner.random_range(0..len)
    }

    /// True with the given percentage chance (0-100)
    pub fn percent(&mut self, chance: u8) -> bool {
        match chance {
            0 => false,
            c if c >= 100 => true,
            c => self.inner.random_range(0..100u8) < c,
        }
    }

    /// Choose a random element from a slice
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index(items.len());
        Some(items[idx])
    }

    /// Fisher-Yates shuffle driven by this stream
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

impl PartialEq for FoodRng {
    fn eq(&self, other: &Self) -> bool {
        self.state() == other.state()
    }
}

impl Eq for FoodRng {}

impl From<RngState> for FoodRng {
    fn from(state: RngState) -> Self {
        let mut rng = FoodRng::new(state.seed);
        rng.inner.set_word_pos(state.word_pos);
        rng
    }
}

impl From<FoodRng> for RngState {
    fn from(rng: FoodRng) -> Self {
        rng.state()
    }
}
