use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Default number of levels a list may reach.
pub const MAX_LEVEL: usize = 32;

/// Default probability that a node reaching level `n` also reaches level `n + 1`.
pub const P: f64 = 0.25;

// /////////////////////////////////////////////////////////////////////////////////////////////////
// Level Generator
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// Upon the insertion of a new node in the list, the node is replicated to higher levels with a
/// certain probability as determined by a `LevelGenerator`.
///
/// `total()` is the maximum height a node may have, and `random()` must produce a height in the
/// range `[1, total]`.  Each call must be independent of the previous ones.
pub trait LevelGenerator {
    fn random(&mut self) -> usize;
    fn total(&self) -> usize;
}

/// A level generator which produces geometrically distributed heights: a node reaching level `n`
/// reaches level `n + 1` with probability `p`, up to `total` levels.
///
/// Every generator owns its random number generator, so two lists never share hidden state and a
/// seeded generator always produces the same sequence of heights.
#[derive(Clone, Debug)]
pub struct GeometricalLevelGenerator {
    total: usize,
    p: f64,
    rng: SmallRng,
}

impl GeometricalLevelGenerator {
    /// Create a new GeometricalLevelGenerator with `total` number of levels, and `p` as the
    /// probability that a given node is present in the next level.  The random number generator
    /// is seeded from the operating system.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not strictly between 0 and 1, or if `total` is 0.
    pub fn new(total: usize, p: f64) -> Self {
        Self::with_rng(total, p, SmallRng::from_entropy())
    }

    /// Same as `new`, but the sequence of heights is fully determined by `seed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::{GeometricalLevelGenerator, LevelGenerator};
    ///
    /// let mut a = GeometricalLevelGenerator::with_seed(16, 0.5, 42);
    /// let mut b = GeometricalLevelGenerator::with_seed(16, 0.5, 42);
    /// for _ in 0..100 {
    ///     assert_eq!(a.random(), b.random());
    /// }
    /// ```
    pub fn with_seed(total: usize, p: f64, seed: u64) -> Self {
        Self::with_rng(total, p, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(total: usize, p: f64, rng: SmallRng) -> Self {
        if total == 0 {
            panic!("total must be non-zero.");
        }
        if p <= 0.0 || p >= 1.0 {
            panic!("p must be in (0, 1).");
        }
        GeometricalLevelGenerator { total, p, rng }
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Default for GeometricalLevelGenerator {
    fn default() -> Self {
        GeometricalLevelGenerator::new(MAX_LEVEL, P)
    }
}

impl LevelGenerator for GeometricalLevelGenerator {
    fn random(&mut self) -> usize {
        let mut height = 1;
        while height < self.total && self.rng.gen_bool(self.p) {
            height += 1;
        }
        height
    }

    fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_by_total() {
        let mut lg = GeometricalLevelGenerator::with_seed(3, 0.9, 7);
        for _ in 0..10_000 {
            let h = lg.random();
            assert!(h >= 1 && h <= 3, "height {} out of range", h);
        }
    }

    #[test]
    fn single_level() {
        let mut lg = GeometricalLevelGenerator::with_seed(1, 0.5, 7);
        for _ in 0..100 {
            assert_eq!(lg.random(), 1);
        }
    }

    #[test]
    fn roughly_geometric() {
        let mut lg = GeometricalLevelGenerator::with_seed(MAX_LEVEL, P, 1);
        let samples = 100_000;
        let tall = (0..samples).filter(|_| lg.random() > 1).count();
        // expect about samples * P nodes above level 1
        let expected = (samples as f64 * P) as usize;
        assert!(tall > expected * 9 / 10 && tall < expected * 11 / 10, "{} tall nodes", tall);
    }

    #[test]
    #[should_panic]
    fn zero_levels() {
        GeometricalLevelGenerator::new(0, 0.5);
    }

    #[test]
    #[should_panic]
    fn p_out_of_range() {
        GeometricalLevelGenerator::new(16, 1.0);
    }
}
