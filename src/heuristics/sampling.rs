//! Biased index samplers for sorted candidate lists.
//!
//! Both samplers favour the front of the list (the best-ranked candidates)
//! while still giving every position a chance.

use crate::config::Distribution;
use rand::{Rng, RngCore};

/// Draws a position in a list sorted from best to worst
pub trait BiasedSampler {
    /// Index in `0..len`. `len` must be positive.
    fn sample_index(&self, len: usize, rng: &mut dyn RngCore) -> usize;
    fn name(&self) -> &str;
}

/// Uniform draw in `(0, 1]`
#[inline]
fn open_unit(rng: &mut dyn RngCore) -> f64 {
    1.0 - rng.gen::<f64>()
}

/// Geometric-like sampler: `floor(ln(U) / ln(1 - beta)) mod len`.
///
/// `beta` close to 0 behaves like a uniform draw, close to 1 like a pure greedy
/// choice of the first candidate.
#[derive(Debug, Clone, Copy)]
pub struct Geometric {
    pub beta: f64,
}

impl Geometric {
    pub fn new(beta: f64) -> Self {
        Geometric { beta }
    }
}

impl BiasedSampler for Geometric {
    fn sample_index(&self, len: usize, rng: &mut dyn RngCore) -> usize {
        debug_assert!(len > 0);
        if self.beta <= 0.0 {
            return rng.gen_range(0..len);
        }
        let u = open_unit(rng);
        let position = (u.ln() / (1.0 - self.beta).ln()).floor();
        (position as usize) % len
    }

    fn name(&self) -> &str {
        "Geometric"
    }
}

/// Triangular sampler: `floor(len * (1 - sqrt(U)))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangular;

impl BiasedSampler for Triangular {
    fn sample_index(&self, len: usize, rng: &mut dyn RngCore) -> usize {
        debug_assert!(len > 0);
        let u = open_unit(rng);
        let position = (len as f64 * (1.0 - u.sqrt())).floor() as usize;
        position.min(len - 1)
    }

    fn name(&self) -> &str {
        "Triangular"
    }
}

/// Sampler for one construction call.
///
/// A negative `beta` asks for a bias drawn uniformly in `[0, 1)` for the call.
pub fn sampler_for(distribution: Distribution, beta: f64, rng: &mut dyn RngCore) -> Box<dyn BiasedSampler> {
    match distribution {
        Distribution::Geometric => {
            let beta = if beta >= 0.0 { beta } else { rng.gen::<f64>() };
            Box::new(Geometric::new(beta))
        }
        Distribution::Triangular => Box::new(Triangular),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn histogram(sampler: &dyn BiasedSampler, len: usize, draws: usize) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts = vec![0; len];
        for _ in 0..draws {
            let idx = sampler.sample_index(len, &mut rng);
            assert!(idx < len);
            counts[idx] += 1;
        }
        counts
    }

    #[test]
    fn test_geometric_is_biased_to_front() {
        let counts = histogram(&Geometric::new(0.5), 10, 10_000);
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[3]);
    }

    #[test]
    fn test_geometric_near_one_is_greedy() {
        let counts = histogram(&Geometric::new(0.999_999), 10, 1_000);
        assert!(counts[0] >= 995);
    }

    #[test]
    fn test_geometric_zero_is_uniform() {
        let counts = histogram(&Geometric::new(0.0), 4, 8_000);
        assert!(counts.iter().all(|&c| c > 1_500));
    }

    #[test]
    fn test_triangular_stays_in_range_and_prefers_front() {
        let counts = histogram(&Triangular, 5, 10_000);
        assert!(counts[0] > counts[4]);
        assert_eq!(histogram(&Triangular, 1, 100), vec![100]);
    }

    #[test]
    fn test_random_beta_sampler() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sampler = sampler_for(Distribution::Geometric, -1.0, &mut rng);
        assert_eq!(sampler.name(), "Geometric");
        assert!(sampler.sample_index(3, &mut rng) < 3);
    }
}
