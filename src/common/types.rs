//! Unified market, inventory and wallet types shared across the engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Item type identifier (ESI `type_id`)
pub type ItemId = u32;

/// Station identifier (ESI `location_id`)
pub type LocationId = u64;

/// Side of a trade from the engine's perspective.
///
/// A `Buy` quote is a price at which units can be acquired (an
/// outstanding market ask); a `Sell` quote is a price at which units
/// can be disposed (an outstanding bid). Character-owned orders and
/// wallet transactions use the same perspective: an own buy order
/// acquires units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A trade hub: one station in one market region
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeHub {
    /// Human-readable hub name (e.g. "Jita")
    pub name: String,
    /// Market region the station sits in
    pub region_id: u64,
    /// Station identifier used for location matching
    pub station_id: LocationId,
}

impl TradeHub {
    pub fn new(name: impl Into<String>, region_id: u64, station_id: LocationId) -> Self {
        Self {
            name: name.into(),
            region_id,
            station_id,
        }
    }
}

impl std::fmt::Display for TradeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single market quote or open order
///
/// Invariants: `price > 0` and `0 <= volume_remain <= volume_total`.
/// Records violating them are dropped at the provider boundary with a
/// warning; [`PriceQuote::is_well_formed`] re-checks before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub side: Side,
    /// Unit price in ISK
    pub price: Decimal,
    /// Units still open on the order
    pub volume_remain: i64,
    /// Units the order was issued with
    pub volume_total: i64,
    /// When the order was issued
    pub issued_at: DateTime<Utc>,
    pub order_id: u64,
}

impl PriceQuote {
    /// Check the shape invariants on this quote
    pub fn is_well_formed(&self) -> bool {
        self.price > Decimal::ZERO
            && self.volume_remain >= 0
            && self.volume_remain <= self.volume_total
    }

    /// Filled fraction of the order as a percentage; 0 when
    /// `volume_total` is 0.
    pub fn fill_progress_pct(&self) -> Decimal {
        if self.volume_total == 0 {
            return Decimal::ZERO;
        }
        let filled = Decimal::from(self.volume_total - self.volume_remain);
        filled / Decimal::from(self.volume_total) * Decimal::from(100)
    }

    /// ISK still riding on the unfilled remainder of this order
    pub fn remaining_value(&self) -> Decimal {
        self.price * Decimal::from(self.volume_remain)
    }
}

/// One wallet transaction, immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub side: Side,
    /// Price actually paid or received per unit
    pub unit_price: Decimal,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
    /// Fees charged on this transaction, if reported
    #[serde(default)]
    pub fee_paid: Decimal,
}

/// One stack of a held item at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLine {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub quantity: i64,
}

/// Aggregate view of outstanding contracts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    /// Contracts currently outstanding or in progress
    pub open_count: i64,
    /// Collateral committed across those contracts, in ISK
    pub total_collateral: Decimal,
}

/// Logical key under which a snapshot is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKey {
    MarketQuotes,
    WalletTransactions,
    OpenOrders,
    Assets,
    WalletBalance,
    Contracts,
}

impl std::fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SnapshotKey::MarketQuotes => "market_quotes",
            SnapshotKey::WalletTransactions => "wallet_transactions",
            SnapshotKey::OpenOrders => "open_orders",
            SnapshotKey::Assets => "assets",
            SnapshotKey::WalletBalance => "wallet_balance",
            SnapshotKey::Contracts => "contracts",
        };
        write!(f, "{name}")
    }
}

/// Payload stored under a [`SnapshotKey`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotPayload {
    Quotes(Vec<PriceQuote>),
    Transactions(Vec<WalletTransaction>),
    Orders(Vec<PriceQuote>),
    Assets(Vec<AssetLine>),
    Balance(Decimal),
    Contracts(ContractSummary),
}

/// An immutable, timestamped capture produced by one refresh tick.
///
/// Snapshots are read by all derived computations within their tick and
/// superseded wholesale by the next successful fetch of the same key;
/// there is no partial mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub payload: SnapshotPayload,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>, payload: SnapshotPayload) -> Self {
        Self { taken_at, payload }
    }

    /// Quotes stored in this snapshot, if it holds market or order data
    pub fn quotes(&self) -> Option<&[PriceQuote]> {
        match &self.payload {
            SnapshotPayload::Quotes(q) | SnapshotPayload::Orders(q) => Some(q),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(price: Decimal, remain: i64, total: i64) -> PriceQuote {
        PriceQuote {
            item_id: 34,
            location_id: 60003760,
            side: Side::Buy,
            price,
            volume_remain: remain,
            volume_total: total,
            issued_at: Utc::now(),
            order_id: 1,
        }
    }

    #[test]
    fn well_formed_quote_passes_invariants() {
        assert!(quote(dec!(5.50), 10, 100).is_well_formed());
        assert!(quote(dec!(5.50), 0, 100).is_well_formed());
    }

    #[test]
    fn malformed_quotes_fail_invariants() {
        assert!(!quote(dec!(0), 10, 100).is_well_formed());
        assert!(!quote(dec!(-1), 10, 100).is_well_formed());
        assert!(!quote(dec!(5), -1, 100).is_well_formed());
        assert!(!quote(dec!(5), 101, 100).is_well_formed());
    }

    #[test]
    fn fill_progress_handles_zero_total() {
        assert_eq!(quote(dec!(5), 0, 0).fill_progress_pct(), Decimal::ZERO);
        assert_eq!(quote(dec!(5), 25, 100).fill_progress_pct(), dec!(75));
    }

    #[test]
    fn remaining_value_scales_with_volume() {
        assert_eq!(quote(dec!(2.5), 40, 100).remaining_value(), dec!(100));
    }

    #[test]
    fn snapshot_round_trip_preserves_fields() {
        let snapshot = Snapshot::new(
            Utc::now(),
            SnapshotPayload::Quotes(vec![quote(dec!(123456.78), 7, 50)]),
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
