use rand::Rng;

/// Source of randomness consumed by every stochastic
/// operation in the crate.
///
/// Any [`rand::Rng`] implements it, so a seeded generator
/// can be passed wherever a `RandomSource` is expected,
/// making runs reproducible.
///
/// # Examples
/// ```
/// use neatkit::RandomSource;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let x = rng.uniform(-1.0, 1.0);
/// assert!((-1.0..=1.0).contains(&x));
/// assert!(rng.index(2, 4) >= 2);
/// ```
pub trait RandomSource {
    /// Returns a value drawn uniformly from `[low, high]`.
    ///
    /// # Panics
    /// Panics if `low > high`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Returns a value drawn uniformly from `[0, 1)`.
    fn uniform01(&mut self) -> f64;

    /// Returns `true` or `false` with equal probability.
    fn coin_flip(&mut self) -> bool;

    /// Returns an integer drawn uniformly from `[low, high]`.
    ///
    /// # Panics
    /// Panics if `low > high`.
    fn index(&mut self, low: usize, high: usize) -> usize;

    /// Returns `true` with probability `chance`.
    ///
    /// A chance of 0 never succeeds, and a chance
    /// of 1 always does.
    fn chance(&mut self, chance: f64) -> bool {
        self.uniform01() < chance
    }
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        assert!(
            low <= high,
            "invalid uniform range [{}, {}]: low exceeds high",
            low,
            high
        );
        if low == high {
            low
        } else {
            self.gen_range(low..=high)
        }
    }

    fn uniform01(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn coin_flip(&mut self) -> bool {
        self.gen::<bool>()
    }

    fn index(&mut self, low: usize, high: usize) -> usize {
        assert!(
            low <= high,
            "invalid index range [{}, {}]: low exceeds high",
            low,
            high
        );
        self.gen_range(low..=high)
    }
}
