//! Random sources for die rolls.
//!
//! Production rollers draw from OS entropy. Seeded sources make whole
//! sessions reproducible, and scripted sources replay an exact value
//! sequence for tests and audits.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A source of die-roll values.
pub trait RandomSource {
    /// Produce a uniform value in `1..=sides`.
    fn next(&mut self, sides: u32) -> u32;
}

/// A source backed by OS entropy. The production default.
#[derive(Debug)]
pub struct EntropySource {
    rng: StdRng,
}

impl EntropySource {
    /// Create a source seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropySource {
    fn next(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides.max(1))
    }
}

/// A deterministic source seeded with a fixed value.
///
/// Two sources with the same seed produce the same roll sequence.
#[derive(Debug)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    /// Create a source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides.max(1))
    }
}

/// A source that replays a scripted list of values.
///
/// Values outside `1..=sides` are clamped into range. Once the script is
/// exhausted, the source yields the midpoint of the die.
#[derive(Debug, Clone)]
pub struct FixedSource {
    values: VecDeque<u32>,
}

impl FixedSource {
    /// Create a source that yields the given values in order.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// How many scripted values remain.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for FixedSource {
    fn next(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match self.values.pop_front() {
            Some(v) => v.clamp(1, sides),
            None => sides.div_ceil(2),
        }
    }
}
