//! Range checks for [`ModelConfig`]

use super::{ConfigError, ModelConfig};

fn out_of_range(field: &str, value: f64, reason: &str) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be finite"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(out_of_range(field, value, "must be >= 0"));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(out_of_range(field, value, "must be > 0"));
    }
    Ok(())
}

fn unit(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(out_of_range(field, value, "must lie in [0, 1]"));
    }
    Ok(())
}

fn at_least_one(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(out_of_range(field, 0.0, "must be >= 1"));
    }
    Ok(())
}

impl ModelConfig {
    /// Check every parameter against its admissible range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.simulation;
        at_least_one("simulation.periods_per_year", s.periods_per_year)?;
        if s.warm_up_periods > s.periods {
            return Err(out_of_range(
                "simulation.warm_up_periods",
                s.warm_up_periods as f64,
                "must not exceed simulation.periods",
            ));
        }

        let p = &self.population;
        at_least_one("population.banks", p.banks)?;
        at_least_one("population.regions", p.regions)?;
        if p.sectors.is_empty() {
            return Err(out_of_range("population.sectors", 0.0, "needs at least one sector"));
        }
        positive("population.wage_mean", p.wage_mean)?;
        positive("population.productivity_mean", p.productivity_mean)?;
        unit("population.initial_unemployment_rate", p.initial_unemployment_rate)?;
        positive("population.wealth_shape", p.wealth_shape)?;
        non_negative("population.firm_leverage", p.firm_leverage)?;
        unit("population.bank_capital_ratio", p.bank_capital_ratio)?;

        let f = &self.firm;
        non_negative("firm.markup_min", f.markup_min)?;
        finite("firm.markup_max", f.markup_max)?;
        if f.markup_min > f.markup_max {
            return Err(out_of_range(
                "firm.markup_min",
                f.markup_min,
                "must not exceed firm.markup_max",
            ));
        }
        if f.initial_markup < f.markup_min || f.initial_markup > f.markup_max {
            return Err(out_of_range(
                "firm.initial_markup",
                f.initial_markup,
                "must lie within [markup_min, markup_max]",
            ));
        }
        non_negative("firm.markup_adjustment_speed", f.markup_adjustment_speed)?;
        non_negative("firm.inventory_target_ratio", f.inventory_target_ratio)?;
        unit("firm.expectation_smoothing", f.expectation_smoothing)?;
        non_negative("firm.productivity_noise", f.productivity_noise)?;
        positive("firm.capacity_per_capital", f.capacity_per_capital)?;
        for (sector, coefficient) in &f.sector_labour_coefficients {
            if !p.sectors.contains(sector) {
                return Err(ConfigError::UnknownSector(sector.clone()));
            }
            positive("firm.sector_labour_coefficients", *coefficient)?;
        }
        unit("firm.dividend_payout_ratio", f.dividend_payout_ratio)?;
        unit("firm.entry_rate", f.entry_rate)?;
        positive("firm.entrant_size_ratio", f.entrant_size_ratio)?;
        at_least_one("firm.insolvency_threshold", f.insolvency_threshold as usize)?;
        non_negative("firm.initial_equity_tolerance", f.initial_equity_tolerance)?;

        let h = &self.household;
        unit("household.mpc_mean", h.mpc_mean)?;
        non_negative("household.mpc_std", h.mpc_std)?;
        unit("household.wealth_draw_rate", h.wealth_draw_rate)?;
        positive("household.reservation_wage_ratio", h.reservation_wage_ratio)?;
        unit("household.reservation_wage_decay", h.reservation_wage_decay)?;
        unit("household.reservation_wage_floor", h.reservation_wage_floor)?;
        at_least_one("household.job_search_sample_size", h.job_search_sample_size)?;

        let b = &self.bank;
        unit("bank.capital_requirement", b.capital_requirement)?;
        positive("bank.risk_weight", b.risk_weight)?;
        non_negative("bank.base_interest_markup", b.base_interest_markup)?;
        non_negative("bank.risk_premium_sensitivity", b.risk_premium_sensitivity)?;
        non_negative("bank.lending_threshold", b.lending_threshold)?;
        non_negative("bank.collateral_threshold", b.collateral_threshold)?;
        non_negative("bank.deposit_spread", b.deposit_spread)?;
        at_least_one("bank.loan_maturity", b.loan_maturity)?;
        unit("bank.risk_appetite_cut", b.risk_appetite_cut)?;
        unit("bank.risk_appetite_recovery", b.risk_appetite_recovery)?;

        let c = &self.central_bank;
        finite("central_bank.inflation_target", c.inflation_target)?;
        finite("central_bank.neutral_rate", c.neutral_rate)?;
        non_negative("central_bank.inflation_coefficient", c.inflation_coefficient)?;
        non_negative("central_bank.output_gap_coefficient", c.output_gap_coefficient)?;
        unit("central_bank.smoothing", c.smoothing)?;
        finite("central_bank.lower_bound", c.lower_bound)?;
        unit("central_bank.potential_output_smoothing", c.potential_output_smoothing)?;

        let g = &self.government;
        unit("government.corporate_tax_rate", g.corporate_tax_rate)?;
        unit("government.income_tax_rate", g.income_tax_rate)?;
        non_negative("government.spending_gdp_ratio", g.spending_gdp_ratio)?;
        non_negative("government.unemployment_benefit_ratio", g.unemployment_benefit_ratio)?;
        non_negative("government.debt_gdp_target", g.debt_gdp_target)?;
        non_negative("government.adjustment_speed", g.adjustment_speed)?;

        let m = &self.markets;
        unit("markets.price_adjustment_speed", m.price_adjustment_speed)?;
        unit("markets.quantity_adjustment_speed", m.quantity_adjustment_speed)?;
        unit("markets.wage_stickiness", m.wage_stickiness)?;
        at_least_one("markets.matching_sample_size", m.matching_sample_size)?;
        unit("markets.separation_rate", m.separation_rate)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_markup_bounds() {
        let mut config = ModelConfig::default();
        config.firm.markup_min = 0.5;
        config.firm.markup_max = 0.2;
        config.firm.initial_markup = 0.3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "firm.markup_min"
        ));
    }

    #[test]
    fn test_rejects_nan() {
        let mut config = ModelConfig::default();
        config.markets.separation_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_coefficient_for_unknown_sector() {
        let mut config = ModelConfig::default();
        config
            .firm
            .sector_labour_coefficients
            .insert("shipbuilding".to_string(), 0.1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownSector("shipbuilding".to_string()))
        );
    }

    #[test]
    fn test_zero_firms_is_allowed() {
        let mut config = ModelConfig::default();
        config.population.firms = 0;
        assert!(config.validate().is_ok());
    }
}
