//! Period clock for the simulation
//!
//! The simulation advances in discrete periods (quarters by default).
//! Period indices are 1-based: the first executed period is period 1 and
//! period 0 denotes the initial state before anything has run.

use serde::{Deserialize, Serialize};

/// Tracks committed periods against the configured run length
///
/// # Example
/// ```
/// use macro_abm_core_rs::PeriodClock;
///
/// let mut clock = PeriodClock::new(8, 4);
/// assert_eq!(clock.current_period(), 0);
/// assert_eq!(clock.next_period(), 1);
///
/// clock.advance();
/// assert_eq!(clock.current_period(), 1);
/// assert!(!clock.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodClock {
    /// Number of fully committed periods
    current_period: usize,
    /// Configured run length
    total_periods: usize,
    /// Periods in one year (rates are quoted per year)
    periods_per_year: usize,
}

impl PeriodClock {
    /// Create a clock at period 0
    ///
    /// # Panics
    /// Panics if `periods_per_year` is zero
    pub fn new(total_periods: usize, periods_per_year: usize) -> Self {
        assert!(periods_per_year > 0, "periods_per_year must be positive");
        Self {
            current_period: 0,
            total_periods,
            periods_per_year,
        }
    }

    /// Mark one more period as committed
    pub fn advance(&mut self) {
        self.current_period += 1;
    }

    /// Last committed period (0 before the first step)
    pub fn current_period(&self) -> usize {
        self.current_period
    }

    /// Index of the period that the next step will execute
    pub fn next_period(&self) -> usize {
        self.current_period + 1
    }

    pub fn total_periods(&self) -> usize {
        self.total_periods
    }

    pub fn periods_per_year(&self) -> usize {
        self.periods_per_year
    }

    /// Year (0-based) that a period falls in
    pub fn year_of(&self, period: usize) -> usize {
        period.saturating_sub(1) / self.periods_per_year
    }

    /// Convert an annual rate into the per-period rate
    pub fn per_period(&self, annual_rate: f64) -> f64 {
        annual_rate / self.periods_per_year as f64
    }

    /// True once the configured number of periods has been committed
    pub fn is_finished(&self) -> bool {
        self.current_period >= self.total_periods
    }

    /// Periods left before the configured end
    pub fn remaining(&self) -> usize {
        self.total_periods.saturating_sub(self.current_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "periods_per_year must be positive")]
    fn test_zero_periods_per_year_panics() {
        PeriodClock::new(10, 0);
    }

    #[test]
    fn test_per_period_rate() {
        let clock = PeriodClock::new(10, 4);
        assert!((clock.per_period(0.04) - 0.01).abs() < 1e-12);
    }
}
