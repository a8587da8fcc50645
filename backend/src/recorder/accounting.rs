//! Stock-flow consistency checks
//!
//! Every payment in the model moves two balances that belong to different
//! sectors, so financial net worth summed over households, firms, banks,
//! government and the central bank is zero at all times. Real assets
//! (capital, inventory) are excluded; they are nobody's liability.
//!
//! Bank equity has a sharper check: between the start and end of a period
//! it moves only by the bank's reported net income.

use serde::{Deserialize, Serialize};

use crate::models::ids::BankId;
use crate::models::state::{SectorBalances, World};

/// Sector positions and money supply at the end of one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockFlowCheck {
    pub period: usize,
    pub balances: SectorBalances,
    pub money_stock: f64,
    pub money_change: f64,
    /// Sum of sector net worth; zero when the books close
    pub residual: f64,
}

impl StockFlowCheck {
    /// Measure a World whose bank positions have been refreshed
    pub fn measure(period: usize, world: &World, previous_money_stock: f64) -> Self {
        let balances = world.sector_balances();
        let money_stock = world.money_stock();
        Self {
            period,
            balances,
            money_stock,
            money_change: money_stock - previous_money_stock,
            residual: balances.total(),
        }
    }

    /// Residual relative to the largest sector position
    pub fn relative_residual(&self) -> f64 {
        self.residual.abs() / self.balances.scale()
    }

    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.relative_residual() <= tolerance
    }
}

/// One bank's equity movement against its income statement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankEquityCheck {
    pub bank: BankId,
    pub equity_change: f64,
    pub net_income: f64,
    /// Largest balance-sheet position, used to scale the tolerance
    pub scale: f64,
}

impl BankEquityCheck {
    /// Check every bank; call after phase 13, before the next period opens
    pub fn measure(world: &World) -> Vec<Self> {
        world
            .banks()
            .iter()
            .map(|bank| Self {
                bank: bank.id(),
                equity_change: bank.equity() - bank.equity_at_open(),
                net_income: bank.flows().net_income(),
                scale: [bank.reserves().abs(), bank.loans(), bank.deposits(), 1.0]
                    .into_iter()
                    .fold(0.0, f64::max),
            })
            .collect()
    }

    pub fn gap(&self) -> f64 {
        self.equity_change - self.net_income
    }

    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.gap().abs() <= tolerance * self.scale
    }
}

/// Central-bank bond holdings against outstanding government debt
pub fn bonds_match_debt(world: &World, tolerance: f64) -> bool {
    let debt = world.government().debt();
    (world.central_bank().bonds() - debt).abs() <= tolerance * debt.abs().max(1.0)
}
