//! Distribution sampling on top of [`RngManager`]

use super::RngManager;

impl RngManager {
    /// Standard normal draw (Box-Muller)
    pub fn standard_normal(&mut self) -> f64 {
        // 1 - u keeps the log argument in (0, 1]
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Normal draw with the given mean and standard deviation
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }

    /// Lognormal draw parameterised by the mean and standard deviation of
    /// the resulting (not the underlying) distribution.
    ///
    /// A non-positive mean yields 0.
    pub fn lognormal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if mean <= 0.0 {
            return 0.0;
        }
        let variance_ratio = (std_dev / mean).powi(2);
        let sigma2 = (1.0 + variance_ratio).ln();
        let mu = mean.ln() - 0.5 * sigma2;
        (mu + sigma2.sqrt() * self.standard_normal()).exp()
    }

    /// Pareto draw with the given shape and scale (minimum value)
    pub fn pareto(&mut self, shape: f64, scale: f64) -> f64 {
        let u = 1.0 - self.next_f64();
        scale / u.powf(1.0 / shape)
    }

    /// Binomial draw by summing `n` Bernoulli trials
    pub fn binomial(&mut self, n: usize, p: f64) -> usize {
        if p <= 0.0 {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        (0..n).filter(|_| self.chance(p)).count()
    }

    /// Sample `k` distinct indices from `[0, n)` (partial Fisher-Yates)
    ///
    /// Returns all `n` indices in shuffled order when `k >= n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let take = k.min(n);
        for i in 0..take {
            let j = i + self.index(n - i);
            pool.swap(i, j);
        }
        pool.truncate(take);
        pool
    }

    /// Shuffle a slice in place (Fisher-Yates)
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}
