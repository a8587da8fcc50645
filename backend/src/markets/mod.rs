//! Market clearing
//!
//! Markets are stateless between calls: each clearing reads the agents it
//! needs from the World, applies the outcome, and hands back a summary.
//! Only the goods market is a pure function of its inputs; the labour and
//! credit markets draw from the agents' substreams and move balances
//! through the World's payment primitives.

pub mod credit;
pub mod goods;
pub mod labour;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use credit::{CreditMarket, CreditOutcome};
pub use goods::{GoodsAllocation, GoodsMarket, GoodsOffer, GoodsOutcome};
pub use labour::{LabourMarket, LabourOutcome, Match, Seeker, Vacancy};

/// Which market a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Goods,
    Labour,
    Credit,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Goods => write!(f, "goods"),
            Market::Labour => write!(f, "labour"),
            Market::Credit => write!(f, "credit"),
        }
    }
}
