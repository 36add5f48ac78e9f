//! # Random Number Generation
//!
//! A single seeded engine shared by every draw an owner makes. Seed it with
//! [`RandomGenerator::with_seed`] to make a derivation reproducible; the
//! default constructor pulls its seed from the operating system.

use std::fmt::Display;

use rand::distr::uniform::SampleUniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{GrammarError, Result};

#[derive(Debug, Clone)]
pub struct RandomGenerator {
    rng: StdRng,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a value drawn uniformly from `[min, max]`, both inclusive.
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidRange`] when `min > max`. The range is never
    /// clamped or swapped.
    pub fn generate_uniform<T>(&mut self, min: T, max: T) -> Result<T>
    where
        T: SampleUniform + PartialOrd + Copy + Display,
    {
        if min > max {
            return Err(invalid_range(min, max));
        }
        Ok(self.rng.random_range(min..=max))
    }

    /// Samples a normal distribution with `mean` and `std_dev`, truncated
    /// toward zero. The result is *not* bounded by the arguments.
    ///
    /// The arguments are validated like a range (`mean > std_dev` is
    /// rejected), so callers jitter around zero or a small mean.
    pub fn generate_gaussian(&mut self, mean: i32, std_dev: i32) -> Result<i32> {
        if mean > std_dev {
            return Err(invalid_range(mean, std_dev));
        }
        let normal = Normal::new(f64::from(mean), f64::from(std_dev))
            .map_err(|_| invalid_range(mean, std_dev))?;
        Ok(normal.sample(&mut self.rng) as i32)
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_range<T: Display>(min: T, max: T) -> GrammarError {
    GrammarError::InvalidRange {
        min: min.to_string(),
        max: max.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_degenerate_range() {
        let mut rg = RandomGenerator::new();
        for _ in 0..50 {
            assert_eq!(rg.generate_uniform(5, 5).unwrap(), 5);
        }
    }

    #[test]
    fn test_uniform_inverted_range_fails() {
        let mut rg = RandomGenerator::new();
        let err = rg.generate_uniform(5, 1).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidRange { .. }));
        assert_eq!(err.to_string(), "invalid generation range: 5 > 1");
    }

    #[test]
    fn test_uniform_stays_in_bounds() {
        let mut rg = RandomGenerator::with_seed(7);
        for _ in 0..500 {
            let v = rg.generate_uniform(0usize, 3).unwrap();
            assert!(v <= 3);
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = RandomGenerator::with_seed(42);
        let mut b = RandomGenerator::with_seed(42);
        for _ in 0..20 {
            assert_eq!(
                a.generate_uniform(1, 499).unwrap(),
                b.generate_uniform(1, 499).unwrap()
            );
            assert_eq!(
                a.generate_gaussian(0, 500).unwrap(),
                b.generate_gaussian(0, 500).unwrap()
            );
        }
    }

    #[test]
    fn test_gaussian_zero_spread_returns_mean() {
        let mut rg = RandomGenerator::with_seed(1);
        assert_eq!(rg.generate_gaussian(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_gaussian_is_centred_and_unclamped() {
        let mut rg = RandomGenerator::with_seed(3);
        let samples: Vec<i32> = (0..2000)
            .map(|_| rg.generate_gaussian(0, 10).unwrap())
            .collect();
        let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 1.5, "mean drifted to {mean}");
        // A stddev of 10 puts plenty of samples outside [0, 10].
        assert!(samples.iter().any(|&s| !(0..=10).contains(&s)));
    }

    #[test]
    fn test_gaussian_rejects_negative_spread() {
        let mut rg = RandomGenerator::new();
        assert!(rg.generate_gaussian(0, -1).is_err());
    }
}
