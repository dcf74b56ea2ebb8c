// ============================================
// Weighted Sampling
// ============================================
//
// Weighted random selection plus the randomness seam shared by every
// shuffle in the ranker.
//
// Selection: draw uniform in [0, total_weight), walk the candidates
// subtracting each weight until the remainder crosses zero. Floating-point
// rounding can leave a positive remainder after the full walk; the last
// positively weighted candidate absorbs it and selecting it is never an
// error.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("invalid candidate set: {0}")]
    InvalidInput(&'static str),
}

pub type Result<T> = std::result::Result<T, SamplerError>;

/// Uniform randomness in [0, 1), injectable so tests can replay a fixed
/// sequence of draws.
pub trait RandomSource: Send {
    fn next_f64(&mut self) -> f64;
}

/// Entropy-backed source for production use.
#[derive(Debug, Default)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen()
    }
}

/// Seeded source for reproducible runs.
#[derive(Debug)]
pub struct SeededSource(StdRng);

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededSource {
    fn next_f64(&mut self) -> f64 {
        self.0.gen()
    }
}

/// Replays a fixed sequence of draws, cycling once exhausted.
#[derive(Debug)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    next: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, next: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.next % self.draws.len()];
        self.next += 1;
        value
    }
}

/// A candidate paired with its relative weight. Weights need not sum to 1.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    pub item: T,
    pub weight: f64,
}

/// Weighted random selection without replacement. Stateless; removal from
/// the candidate pool is the caller's responsibility.
#[derive(Debug, Default)]
pub struct WeightedSampler;

impl WeightedSampler {
    pub fn new() -> Self {
        Self
    }

    /// Select one candidate proportionally to its weight.
    ///
    /// Fails with `InvalidInput` when the slice is empty or no candidate
    /// carries a positive weight. Non-positive weights are skipped during
    /// the walk.
    pub fn select_one<'a, T>(
        &self,
        candidates: &'a [WeightedChoice<T>],
        rng: &mut dyn RandomSource,
    ) -> Result<&'a T> {
        if candidates.is_empty() {
            return Err(SamplerError::InvalidInput("no candidates"));
        }

        let total: f64 = candidates
            .iter()
            .filter(|candidate| candidate.weight > 0.0)
            .map(|candidate| candidate.weight)
            .sum();
        if total <= 0.0 {
            return Err(SamplerError::InvalidInput("no candidate has positive weight"));
        }

        let mut remainder = rng.next_f64() * total;
        let mut selected = None;
        for candidate in candidates {
            if candidate.weight <= 0.0 {
                continue;
            }
            selected = Some(&candidate.item);
            remainder -= candidate.weight;
            if remainder <= 0.0 {
                break;
            }
        }

        selected.ok_or(SamplerError::InvalidInput("no candidate has positive weight"))
    }
}

/// Unbiased Fisher-Yates shuffle driven by the shared randomness seam.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = uniform_index(i + 1, rng);
        items.swap(i, j);
    }
}

/// Uniform index in [0, len). `len` must be non-zero.
pub fn uniform_index(len: usize, rng: &mut dyn RandomSource) -> usize {
    debug_assert!(len > 0, "uniform_index over an empty range");
    let scaled = (rng.next_f64() * len as f64) as usize;
    scaled.min(len.saturating_sub(1))
}
