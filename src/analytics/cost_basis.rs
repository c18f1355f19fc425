//! Weighted-average acquisition cost derived from transaction history

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::types::{ItemId, LocationId, Side, WalletTransaction};

/// Acquisition cost for one (item, location) pair over a lookback window.
///
/// `weighted_avg_unit_cost` is `None` when no purchase transactions fell
/// inside the window. Callers must fall back to a market-estimate price
/// and tag the source; they must never treat `None` as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBasis {
    pub item_id: ItemId,
    pub location_id: LocationId,
    /// Quantity-weighted average price paid per unit
    pub weighted_avg_unit_cost: Option<Decimal>,
    /// Total units bought inside the window
    pub quantity_basis: i64,
    /// Total ISK spent on those units
    pub total_cost: Decimal,
    /// Number of purchase transactions in the window
    pub purchase_count: usize,
    pub first_purchase: Option<DateTime<Utc>>,
    pub last_purchase: Option<DateTime<Utc>>,
}

impl CostBasis {
    /// Whether any purchase history backs this cost basis
    pub fn has_history(&self) -> bool {
        self.weighted_avg_unit_cost.is_some()
    }

    fn empty(item_id: ItemId, location_id: LocationId) -> Self {
        Self {
            item_id,
            location_id,
            weighted_avg_unit_cost: None,
            quantity_basis: 0,
            total_cost: Decimal::ZERO,
            purchase_count: 0,
            first_purchase: None,
            last_purchase: None,
        }
    }
}

/// Converts a time-ordered transaction history into a weighted-average
/// acquisition cost.
///
/// Stateless and idempotent: `now` is an explicit input, so the same
/// inputs always produce the same output.
pub struct CostBasisEngine;

impl CostBasisEngine {
    /// Compute the cost basis for `(item_id, location_id)` from buy
    /// transactions inside `[now - lookback_days, now]`.
    ///
    /// Zero-quantity buys are ignored. Negative quantities (returns or
    /// corrections) are not supported: they are flagged with a warning
    /// and skipped.
    pub fn compute(
        item_id: ItemId,
        location_id: LocationId,
        transactions: &[WalletTransaction],
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> CostBasis {
        let cutoff = now - Duration::days(i64::from(lookback_days));

        let mut total_cost = Decimal::ZERO;
        let mut total_quantity: i64 = 0;
        let mut purchase_count = 0usize;
        let mut first_purchase: Option<DateTime<Utc>> = None;
        let mut last_purchase: Option<DateTime<Utc>> = None;

        for tx in transactions {
            if tx.item_id != item_id
                || tx.location_id != location_id
                || tx.side != Side::Buy
                || tx.timestamp < cutoff
                || tx.timestamp > now
            {
                continue;
            }
            if tx.quantity == 0 {
                continue;
            }
            if tx.quantity < 0 {
                warn!(
                    item_id,
                    location_id,
                    quantity = tx.quantity,
                    "negative-quantity buy transaction skipped (returns not supported)"
                );
                continue;
            }

            total_cost += tx.unit_price * Decimal::from(tx.quantity);
            total_quantity += tx.quantity;
            purchase_count += 1;
            first_purchase = Some(match first_purchase {
                Some(t) if t <= tx.timestamp => t,
                _ => tx.timestamp,
            });
            last_purchase = Some(match last_purchase {
                Some(t) if t >= tx.timestamp => t,
                _ => tx.timestamp,
            });
        }

        if total_quantity == 0 {
            return CostBasis::empty(item_id, location_id);
        }

        CostBasis {
            item_id,
            location_id,
            weighted_avg_unit_cost: Some(total_cost / Decimal::from(total_quantity)),
            quantity_basis: total_quantity,
            total_cost,
            purchase_count,
            first_purchase,
            last_purchase,
        }
    }
}
