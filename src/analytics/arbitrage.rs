//! Cross-hub arbitrage scanning

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::errors::{CoreError, Result};
use crate::common::types::{ItemId, LocationId, PriceQuote, Side};

/// Filter bounds applied to scanned opportunities.
///
/// Absent bounds are unbounded; margin bounds are inclusive on both
/// ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanFilters {
    /// Minimum margin percentage, inclusive
    #[serde(default)]
    pub min_margin_pct: Option<Decimal>,
    /// Maximum margin percentage, inclusive
    #[serde(default)]
    pub max_margin_pct: Option<Decimal>,
    /// Minimum of buy-side and sell-side available volume
    #[serde(default)]
    pub min_volume: Option<i64>,
    /// Minimum acquisition price per unit
    #[serde(default)]
    pub min_buy_price: Option<Decimal>,
}

impl ScanFilters {
    /// Reject inverted or nonsensical bounds before any scan runs
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_margin_pct, self.max_margin_pct) {
            if min > max {
                return Err(CoreError::ConfigurationInvalid(format!(
                    "min_margin_pct {min} exceeds max_margin_pct {max}"
                )));
            }
        }
        if let Some(volume) = self.min_volume {
            if volume < 0 {
                return Err(CoreError::ConfigurationInvalid(format!(
                    "min_volume must not be negative, got {volume}"
                )));
            }
        }
        if let Some(price) = self.min_buy_price {
            if price < Decimal::ZERO {
                return Err(CoreError::ConfigurationInvalid(format!(
                    "min_buy_price must not be negative, got {price}"
                )));
            }
        }
        Ok(())
    }

    fn accepts(&self, opportunity: &Opportunity) -> bool {
        if let Some(min) = self.min_margin_pct {
            if opportunity.margin_pct < min {
                return false;
            }
        }
        if let Some(max) = self.max_margin_pct {
            if opportunity.margin_pct > max {
                return false;
            }
        }
        if let Some(volume) = self.min_volume {
            if opportunity.buy_volume.min(opportunity.sell_volume) < volume {
                return false;
            }
        }
        if let Some(price) = self.min_buy_price {
            if opportunity.buy_price < price {
                return false;
            }
        }
        true
    }
}

/// A profitable buy-here/sell-there pair for one item.
///
/// Derived per scan; never persisted across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub item_id: ItemId,
    pub buy_location: LocationId,
    pub sell_location: LocationId,
    /// Best acquisition price at the buy location
    pub buy_price: Decimal,
    /// Best disposal price at the sell location
    pub sell_price: Decimal,
    /// `sell_price - buy_price`
    pub margin_abs: Decimal,
    /// `margin_abs / buy_price * 100`
    pub margin_pct: Decimal,
    /// Volume available behind the buy quote
    pub buy_volume: i64,
    /// Volume available behind the sell quote
    pub sell_volume: i64,
}

/// Scans current quotes for cross-location opportunities.
///
/// This is a two-sided best-quote comparison, not an order-book walk:
/// only the lowest Buy-side quote and the highest Sell-side quote per
/// (item, location) feed the headline numbers.
pub struct ArbitrageScanner;

impl ArbitrageScanner {
    /// Scan all (buy-location, sell-location, item) triples and return
    /// opportunities passing `filters`, ranked by descending
    /// `margin_pct` (ties: higher `margin_abs`, then lower `item_id`).
    ///
    /// Malformed quotes are dropped with a warning; an item or location
    /// missing quotes on one side is simply excluded. An empty result is
    /// valid.
    pub fn scan(quotes: &[PriceQuote], filters: &ScanFilters) -> Result<Vec<Opportunity>> {
        filters.validate()?;

        // Best quote per (item, location) per side.
        let mut best_buy: HashMap<(ItemId, LocationId), &PriceQuote> = HashMap::new();
        let mut best_sell: HashMap<(ItemId, LocationId), &PriceQuote> = HashMap::new();

        for quote in quotes {
            if !quote.is_well_formed() {
                warn!(
                    item_id = quote.item_id,
                    location_id = quote.location_id,
                    order_id = quote.order_id,
                    %quote.price,
                    "dropping malformed quote"
                );
                continue;
            }
            let key = (quote.item_id, quote.location_id);
            match quote.side {
                Side::Buy => {
                    best_buy
                        .entry(key)
                        .and_modify(|q| {
                            if quote.price < q.price {
                                *q = quote;
                            }
                        })
                        .or_insert(quote);
                }
                Side::Sell => {
                    best_sell
                        .entry(key)
                        .and_modify(|q| {
                            if quote.price > q.price {
                                *q = quote;
                            }
                        })
                        .or_insert(quote);
                }
            }
        }

        // Regroup the per-location bests by item.
        let mut buys_by_item: HashMap<ItemId, Vec<&PriceQuote>> = HashMap::new();
        for quote in best_buy.into_values() {
            buys_by_item.entry(quote.item_id).or_default().push(quote);
        }
        let mut sells_by_item: HashMap<ItemId, Vec<&PriceQuote>> = HashMap::new();
        for quote in best_sell.into_values() {
            sells_by_item.entry(quote.item_id).or_default().push(quote);
        }

        let mut opportunities = Vec::new();
        for (item_id, buys) in &buys_by_item {
            let Some(sells) = sells_by_item.get(item_id) else {
                continue;
            };
            for buy in buys {
                for sell in sells {
                    // Same-location trades are not opportunities.
                    if buy.location_id == sell.location_id {
                        continue;
                    }
                    let margin_abs = sell.price - buy.price;
                    let margin_pct = margin_abs / buy.price * dec!(100);
                    let opportunity = Opportunity {
                        item_id: *item_id,
                        buy_location: buy.location_id,
                        sell_location: sell.location_id,
                        buy_price: buy.price,
                        sell_price: sell.price,
                        margin_abs,
                        margin_pct,
                        buy_volume: buy.volume_remain,
                        sell_volume: sell.volume_remain,
                    };
                    if filters.accepts(&opportunity) {
                        opportunities.push(opportunity);
                    }
                }
            }
        }

        opportunities.sort_by(|a, b| {
            b.margin_pct
                .cmp(&a.margin_pct)
                .then(b.margin_abs.cmp(&a.margin_abs))
                .then(a.item_id.cmp(&b.item_id))
        });

        Ok(opportunities)
    }
}
