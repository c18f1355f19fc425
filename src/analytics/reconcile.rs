//! Order and inventory reconciliation against cost basis and live prices

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::cost_basis::CostBasis;
use super::fees::{FeeModel, FeeRates};
use crate::common::types::{AssetLine, ItemId, LocationId, PriceQuote, Side, TradeHub};

/// Where the acquisition cost in an enriched line came from.
///
/// Profit derived from a `MarketEstimate` is reported as estimated,
/// never presented as exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSource {
    /// Weighted-average cost from actual purchase history
    CostBasis,
    /// Best local acquisition price, used when no history exists
    MarketEstimate,
    /// Neither history nor a market estimate was available
    Unknown,
}

/// Aggregated open-order state for one side at one location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSideSummary {
    pub order_count: usize,
    /// Units still open across all orders of this side
    pub volume_remain: i64,
    /// Units originally issued across all orders of this side
    pub volume_total: i64,
    /// ISK riding on the unfilled remainder
    pub remaining_value: Decimal,
    /// Aggregate fill progress, 0 when nothing was issued
    pub fill_progress_pct: Decimal,
}

/// One inventory line enriched with cost, profit and order state.
///
/// Owned by the valuation snapshot for one tick and superseded wholesale
/// on the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedLine {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub quantity: i64,
    /// Acquisition cost per unit, if any source was available
    pub cost_per_unit: Option<Decimal>,
    pub valuation_source: ValuationSource,
    /// Best disposal price currently on the market
    pub live_price: Option<Decimal>,
    /// `live_price` after broker fee and sales tax
    pub effective_sell_price: Option<Decimal>,
    /// `live_price - cost_per_unit`; estimated when the source is not
    /// purchase history
    pub possible_profit_per_unit: Option<Decimal>,
    /// Profit per unit scaled by held quantity
    pub possible_profit_total: Option<Decimal>,
    /// Lowest sell price that still clears the target margin after fees
    pub min_profitable_sell_price: Option<Decimal>,
    pub buy_orders: OrderSideSummary,
    pub sell_orders: OrderSideSummary,
}

/// Valuation summary for one hub over one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubValuation {
    pub hub: TradeHub,
    pub item_count: usize,
    /// Sum of effective sale value across held quantities
    pub total_value: Decimal,
    /// Sum of possible profit over lines that have a cost source
    pub expected_profit: Decimal,
    /// ISK locked in open buy orders at this hub
    pub isk_in_buy_orders: Decimal,
    /// Share of lines backed by real purchase history
    pub cost_basis_coverage_pct: Decimal,
    pub lines: Vec<EnrichedLine>,
}

/// Matches inventory against open orders, cost basis and live prices
pub struct OrderReconciler;

impl OrderReconciler {
    /// Minimum sell price that achieves `margin_pct` over `cost_basis`
    /// after fees:
    ///
    /// `cost_basis * (1 + margin_pct/100) / (1 - total_fee_rate)`
    ///
    /// Monotonically increasing in both the margin and the total fee
    /// rate.
    pub fn min_sell_price(cost_basis: Decimal, margin_pct: Decimal, rates: &FeeRates) -> Decimal {
        let target_net = cost_basis * (Decimal::ONE + margin_pct / dec!(100));
        target_net / (Decimal::ONE - rates.total_rate())
    }

    /// Aggregate all open orders of `side` for `(item_id, location_id)`
    pub fn summarize_side(
        open_orders: &[PriceQuote],
        item_id: ItemId,
        location_id: LocationId,
        side: Side,
    ) -> OrderSideSummary {
        let mut summary = OrderSideSummary::default();
        for order in open_orders {
            if order.item_id != item_id || order.location_id != location_id || order.side != side {
                continue;
            }
            summary.order_count += 1;
            summary.volume_remain += order.volume_remain;
            summary.volume_total += order.volume_total;
            summary.remaining_value += order.remaining_value();
        }
        if summary.volume_total > 0 {
            let filled = Decimal::from(summary.volume_total - summary.volume_remain);
            summary.fill_progress_pct =
                filled / Decimal::from(summary.volume_total) * dec!(100);
        }
        summary
    }

    /// Enrich one inventory line.
    ///
    /// The acquisition cost falls back from purchase history to the
    /// caller-supplied `market_cost_estimate` (tagged
    /// [`ValuationSource::MarketEstimate`]); when neither exists the
    /// profit fields stay `None` rather than defaulting to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile(
        asset: &AssetLine,
        open_orders: &[PriceQuote],
        cost_basis: &CostBasis,
        live_price: Option<Decimal>,
        market_cost_estimate: Option<Decimal>,
        target_margin_pct: Decimal,
        rates: &FeeRates,
    ) -> EnrichedLine {
        let (cost_per_unit, valuation_source) = match cost_basis.weighted_avg_unit_cost {
            Some(cost) => (Some(cost), ValuationSource::CostBasis),
            None => match market_cost_estimate {
                Some(estimate) => (Some(estimate), ValuationSource::MarketEstimate),
                None => (None, ValuationSource::Unknown),
            },
        };

        let effective_sell_price =
            live_price.map(|price| FeeModel::effective_sell_price(price, rates));
        let possible_profit_per_unit = match (live_price, cost_per_unit) {
            (Some(live), Some(cost)) => Some(live - cost),
            _ => None,
        };
        let possible_profit_total =
            possible_profit_per_unit.map(|profit| profit * Decimal::from(asset.quantity));
        let min_profitable_sell_price =
            cost_per_unit.map(|cost| Self::min_sell_price(cost, target_margin_pct, rates));

        EnrichedLine {
            item_id: asset.item_id,
            location_id: asset.location_id,
            quantity: asset.quantity,
            cost_per_unit,
            valuation_source,
            live_price,
            effective_sell_price,
            possible_profit_per_unit,
            possible_profit_total,
            min_profitable_sell_price,
            buy_orders: Self::summarize_side(
                open_orders,
                asset.item_id,
                asset.location_id,
                Side::Buy,
            ),
            sell_orders: Self::summarize_side(
                open_orders,
                asset.item_id,
                asset.location_id,
                Side::Sell,
            ),
        }
    }

    /// Sort lines for display: descending possible profit, lines with
    /// no profit figure last
    pub fn sort_lines(lines: &mut [EnrichedLine]) {
        lines.sort_by(|a, b| match (a.possible_profit_total, b.possible_profit_total) {
            (Some(pa), Some(pb)) => pb.cmp(&pa),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.item_id.cmp(&b.item_id),
        });
    }

    /// Roll enriched lines up into one hub valuation
    pub fn hub_valuation(hub: &TradeHub, mut lines: Vec<EnrichedLine>) -> HubValuation {
        Self::sort_lines(&mut lines);

        let mut total_value = Decimal::ZERO;
        let mut expected_profit = Decimal::ZERO;
        let mut isk_in_buy_orders = Decimal::ZERO;
        let mut with_history = 0usize;

        for line in &lines {
            if let Some(effective) = line.effective_sell_price {
                total_value += effective * Decimal::from(line.quantity);
            }
            if let Some(profit) = line.possible_profit_total {
                expected_profit += profit;
            }
            isk_in_buy_orders += line.buy_orders.remaining_value;
            if line.valuation_source == ValuationSource::CostBasis {
                with_history += 1;
            }
        }

        let cost_basis_coverage_pct = if lines.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(with_history) / Decimal::from(lines.len()) * dec!(100)
        };

        HubValuation {
            hub: hub.clone(),
            item_count: lines.len(),
            total_value,
            expected_profit,
            isk_in_buy_orders,
            cost_basis_coverage_pct,
            lines,
        }
    }
}
