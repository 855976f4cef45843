//! Random source for non-deterministic stages
//!
//! The runner never touches ambient randomness; it asks a `ChoiceSource`
//! for an index. Tests substitute a fixed sequence or a seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks one of `len` candidates
pub trait ChoiceSource: Send {
    /// Return an index in `0..len`. `len` is never zero.
    ///
    /// Out-of-range answers are reduced modulo `len` by the caller.
    fn choose(&mut self, len: usize) -> usize;
}

impl<C: ChoiceSource + ?Sized> ChoiceSource for &mut C {
    fn choose(&mut self, len: usize) -> usize {
        (**self).choose(len)
    }
}

impl<C: ChoiceSource + ?Sized> ChoiceSource for Box<C> {
    fn choose(&mut self, len: usize) -> usize {
        (**self).choose(len)
    }
}

/// Uniform choice backed by a `rand` RNG
#[derive(Debug, Clone)]
pub struct RandomChoice<R = StdRng> {
    rng: R,
}

impl RandomChoice<StdRng> {
    /// Seed from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomChoice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> ChoiceSource for RandomChoice<R> {
    fn choose(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed sequence of indices, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceChoice {
    sequence: Vec<usize>,
    position: usize,
}

impl SequenceChoice {
    /// An empty sequence always answers 0
    pub fn new(sequence: Vec<usize>) -> Self {
        Self {
            sequence,
            position: 0,
        }
    }

    /// Always pick the same index
    pub fn constant(index: usize) -> Self {
        Self::new(vec![index])
    }
}

impl ChoiceSource for SequenceChoice {
    fn choose(&mut self, _len: usize) -> usize {
        if self.sequence.is_empty() {
            return 0;
        }
        let index = self.sequence[self.position % self.sequence.len()];
        self.position += 1;
        index
    }
}

/// Ask `source` for an index and clamp it into `0..len`
pub(crate) fn pick(source: &mut dyn ChoiceSource, len: usize) -> usize {
    source.choose(len) % len
}
