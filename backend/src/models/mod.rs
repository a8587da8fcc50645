//! Domain types: agents, identifiers, events and the World arena

pub mod agent;
pub mod bank;
pub mod central_bank;
pub mod event;
pub mod firm;
pub mod government;
pub mod household;
pub mod ids;
pub mod state;

pub use agent::{Agent, AgentSnapshot};
pub use bank::{Bank, BankSample, CreditApplication, Loan, RejectionReason};
pub use central_bank::CentralBank;
pub use event::{Event, EventLog};
pub use firm::{Firm, FirmSample};
pub use government::Government;
pub use household::{Household, HouseholdSample};
pub use ids::{Account, BankId, FirmId, HouseholdId};
pub use state::{MarketStats, SectorBalances, World};
