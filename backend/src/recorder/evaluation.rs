//! Summary statistics and calibration scoring
//!
//! Statistics are computed over the records after the warm-up periods.
//! Each target passes when the simulated value lies within its absolute
//! tolerance; the overall score is the weighted root-mean-square relative
//! deviation (lower is better).

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::MacroRecord;

/// Aggregate statistics of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Mean per-period GDP growth
    pub gdp_growth_mean: f64,
    pub gdp_growth_std: f64,
    pub unemployment_mean: f64,
    /// Mean per-period inflation
    pub inflation_mean: f64,
    pub inflation_std: f64,
    /// Mean government debt over annual GDP
    pub government_debt_gdp: f64,
    /// Mean labour income share of GDP
    pub wage_share: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation; 0 for fewer than two values
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

impl SummaryStatistics {
    /// Compute over `records[warm_up..]`; `None` if nothing is left
    pub fn compute(records: &[MacroRecord], warm_up: usize, periods_per_year: usize) -> Option<Self> {
        let records = records.get(warm_up..).filter(|r| !r.is_empty())?;

        let growth: Vec<f64> = records
            .windows(2)
            .filter(|w| w[0].gdp > 0.0)
            .map(|w| (w[1].gdp - w[0].gdp) / w[0].gdp)
            .collect();
        let inflation: Vec<f64> = records.iter().map(|r| r.inflation).collect();
        let unemployment: Vec<f64> = records.iter().map(|r| r.unemployment_rate).collect();
        let debt_gdp: Vec<f64> = records
            .iter()
            .filter(|r| r.gdp > 0.0)
            .map(|r| r.government_debt / (r.gdp * periods_per_year as f64))
            .collect();
        let wage_share: Vec<f64> = records
            .iter()
            .filter(|r| r.gdp > 0.0 && r.total_employment > 0)
            .map(|r| r.average_wage * r.total_employment as f64 / r.gdp)
            .collect();

        Some(Self {
            gdp_growth_mean: mean(&growth),
            gdp_growth_std: std_dev(&growth),
            unemployment_mean: mean(&unemployment),
            inflation_mean: mean(&inflation),
            inflation_std: std_dev(&inflation),
            government_debt_gdp: mean(&debt_gdp),
            wage_share: mean(&wage_share),
        })
    }

    /// Look a statistic up by name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "gdp_growth_mean" => Some(self.gdp_growth_mean),
            "gdp_growth_std" => Some(self.gdp_growth_std),
            "unemployment_mean" => Some(self.unemployment_mean),
            "inflation_mean" => Some(self.inflation_mean),
            "inflation_std" => Some(self.inflation_std),
            "government_debt_gdp" => Some(self.government_debt_gdp),
            "wage_share" => Some(self.wage_share),
            _ => None,
        }
    }
}

/// One calibration target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub description: String,
    pub value: f64,
    /// Largest absolute deviation that still passes
    pub tolerance: f64,
    pub weight: f64,
}

impl Target {
    fn new(name: &str, description: &str, value: f64, tolerance: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            value,
            tolerance,
            weight,
        }
    }

    /// UK quarterly calibration targets
    pub fn defaults() -> Vec<Target> {
        vec![
            Target::new("gdp_growth_mean", "Mean quarterly GDP growth (~2% p.a.)", 0.005, 0.003, 2.0),
            Target::new("gdp_growth_std", "Std dev of quarterly GDP growth", 0.010, 0.005, 1.0),
            Target::new("unemployment_mean", "Mean unemployment rate", 0.045, 0.010, 2.0),
            Target::new("inflation_mean", "Mean quarterly inflation (2% p.a. target)", 0.005, 0.003, 2.0),
            Target::new("inflation_std", "Std dev of quarterly inflation", 0.003, 0.002, 1.0),
            Target::new("government_debt_gdp", "Government debt over annual GDP", 0.85, 0.20, 1.0),
            Target::new("wage_share", "Labour income share of GDP", 0.55, 0.10, 1.0),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub name: String,
    pub description: String,
    pub simulated: f64,
    pub target: f64,
    /// `(simulated - target) / |target|`; NaN when undefined
    pub deviation: f64,
    pub tolerance: f64,
    pub passed: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub results: Vec<TargetResult>,
}

impl CalibrationReport {
    /// Score `records` against `targets`
    pub fn evaluate(
        records: &[MacroRecord],
        targets: &[Target],
        warm_up: usize,
        periods_per_year: usize,
    ) -> Self {
        let stats = SummaryStatistics::compute(records, warm_up, periods_per_year);
        let results = targets
            .iter()
            .map(|t| {
                let simulated = stats.and_then(|s| s.get(&t.name)).unwrap_or(f64::NAN);
                let (deviation, passed) = if simulated.is_nan() || t.value == 0.0 {
                    (f64::NAN, false)
                } else {
                    (
                        (simulated - t.value) / t.value.abs(),
                        (simulated - t.value).abs() <= t.tolerance,
                    )
                };
                TargetResult {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    simulated,
                    target: t.value,
                    deviation,
                    tolerance: t.tolerance,
                    passed,
                    weight: t.weight,
                }
            })
            .collect();
        Self { results }
    }

    /// Weighted RMS relative deviation; infinite with no weighted targets
    pub fn overall_score(&self) -> f64 {
        let total_weight: f64 = self.results.iter().map(|r| r.weight).sum();
        if self.results.is_empty() || total_weight == 0.0 {
            return f64::INFINITY;
        }
        let weighted: f64 = self
            .results
            .iter()
            .filter(|r| !r.deviation.is_nan())
            .map(|r| r.weight * r.deviation.powi(2))
            .sum();
        (weighted / total_weight).sqrt()
    }

    pub fn n_passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn n_total(&self) -> usize {
        self.results.len()
    }

    /// Human-readable table
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Calibration: {}/{} targets within tolerance",
            self.n_passed(),
            self.n_total()
        );
        let _ = writeln!(out, "Overall score (WRMS deviation): {:.4}", self.overall_score());
        let width = self.results.iter().map(|r| r.name.len()).max().unwrap_or(10);
        for r in &self.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            let deviation = if r.deviation.is_nan() {
                "  N/A ".to_string()
            } else {
                format!("{:+.1}%", r.deviation * 100.0)
            };
            let _ = writeln!(
                out,
                "  [{status}]  {:<width$}  sim={:8.4}  tgt={:8.4}  dev={deviation}",
                r.name, r.simulated, r.target
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: usize, gdp: f64, inflation: f64) -> MacroRecord {
        MacroRecord {
            period,
            gdp,
            real_gdp: gdp,
            price_index: 1.0,
            inflation,
            unemployment_rate: 0.05,
            average_wage: 1.0,
            policy_rate: 0.03,
            government_deficit: 0.0,
            government_debt: 4.0 * gdp * 0.85,
            total_lending: 0.0,
            new_lending: 0.0,
            loan_rejections: 0,
            firm_bankruptcies: 0,
            firm_entries: 0,
            total_employment: 55,
            live_firms: 1,
            money_stock: 0.0,
            stock_flow_residual: 0.0,
        }
    }

    #[test]
    fn test_growth_statistics() {
        let records = vec![record(1, 100.0, 0.0), record(2, 110.0, 0.01), record(3, 99.0, 0.02)];
        let stats = SummaryStatistics::compute(&records, 0, 4).unwrap();
        // growths 0.1 and -0.1
        assert!(stats.gdp_growth_mean.abs() < 1e-12);
        assert!((stats.gdp_growth_std - 0.1).abs() < 1e-12);
        assert!((stats.inflation_mean - 0.01).abs() < 1e-12);
        assert!((stats.government_debt_gdp - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_warm_up_beyond_records_gives_none() {
        let records = vec![record(1, 100.0, 0.0)];
        assert!(SummaryStatistics::compute(&records, 1, 4).is_none());
    }

    #[test]
    fn test_report_passes_matching_targets() {
        let records: Vec<MacroRecord> = (1..=5).map(|t| record(t, 100.0, 0.005)).collect();
        let report = CalibrationReport::evaluate(&records, &Target::defaults(), 0, 4);
        let passed: Vec<&str> = report
            .results
            .iter()
            .filter(|r| r.passed)
            .map(|r| r.name.as_str())
            .collect();
        assert!(passed.contains(&"unemployment_mean"));
        assert!(passed.contains(&"government_debt_gdp"));
        assert!(passed.contains(&"inflation_mean"));
        assert!(report.summary().contains("targets within tolerance"));
    }

    #[test]
    fn test_empty_report_scores_infinite() {
        let report = CalibrationReport { results: Vec::new() };
        assert!(report.overall_score().is_infinite());
    }
}
