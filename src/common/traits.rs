//! Collaborator contracts between the core and its I/O shell

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::errors::Result;
use super::types::{AssetLine, ContractSummary, PriceQuote, TradeHub, WalletTransaction};
use crate::analytics::{HubValuation, Opportunity};
use crate::engine::Alert;

/// Trait for raw snapshot providers (ESI, fixtures, replays).
///
/// Every method either returns the full fetched record set or fails with
/// `ProviderUnavailable` / `ProviderAuth`. A failure is never reported
/// as an empty result: the scheduler treats it as a failed fetch and
/// keeps the previous snapshot and baselines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch current market quotes for the given hubs
    async fn fetch_market_quotes(&self, hubs: &[TradeHub]) -> Result<Vec<PriceQuote>>;

    /// Fetch wallet transactions recorded at or after `since`
    async fn fetch_wallet_transactions(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>>;

    /// Fetch the character's open market orders
    async fn fetch_open_orders(&self) -> Result<Vec<PriceQuote>>;

    /// Fetch held assets at the given hubs
    async fn fetch_assets(&self, hubs: &[TradeHub]) -> Result<Vec<AssetLine>>;

    /// Fetch the current wallet balance in ISK
    async fn fetch_wallet_balance(&self) -> Result<Decimal>;

    /// Fetch a summary of outstanding contracts
    async fn fetch_contract_summary(&self) -> Result<ContractSummary>;
}

/// Trait for consumers of derived results (dashboards, notifiers).
///
/// Side-effect only; the core never consumes a return value. Sinks must
/// not block the tick for long: slow consumers should buffer internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Publish the ranked opportunity list for this tick
    async fn publish_opportunities(&self, opportunities: &[Opportunity]);

    /// Publish the per-hub valuation snapshot for this tick
    async fn publish_valuation(&self, valuation: &[HubValuation]);

    /// Publish a single threshold alert
    async fn publish_alert(&self, alert: &Alert);
}
