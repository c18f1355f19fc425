//! Pure analytical computations: fees, cost basis, arbitrage and
//! reconciliation
//!
//! Everything in this module is synchronous and side-effect free apart
//! from warnings on dropped records. State (snapshots, baselines) lives
//! in [`crate::engine`].

mod arbitrage;
mod cost_basis;
mod fees;
mod reconcile;

pub use arbitrage::{ArbitrageScanner, Opportunity, ScanFilters};
pub use cost_basis::{CostBasis, CostBasisEngine};
pub use fees::{FeeModel, FeeRates, TradingSkills, MAX_SKILL_LEVEL};
pub use reconcile::{
    EnrichedLine, HubValuation, OrderReconciler, OrderSideSummary, ValuationSource,
};
