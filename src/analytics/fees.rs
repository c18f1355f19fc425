//! Broker-fee and sales-tax rates derived from trading skills
//!
//! Rates are a pure function of the skill tuple: no I/O, no hidden
//! state, safe to cache keyed by [`TradingSkills`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Trained skill levels cap at V
pub const MAX_SKILL_LEVEL: u8 = 5;

/// Skill levels that modify trading fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingSkills {
    /// Reduces broker fees by 0.1% per level
    pub broker_relations: u8,
    /// Reduces sales tax by 11% of the base rate per level
    pub accounting: u8,
}

impl TradingSkills {
    pub fn new(broker_relations: u8, accounting: u8) -> Self {
        Self {
            broker_relations,
            accounting,
        }
        .clamped()
    }

    /// Clamp both levels into the trainable 0..=5 range
    pub fn clamped(self) -> Self {
        Self {
            broker_relations: self.broker_relations.min(MAX_SKILL_LEVEL),
            accounting: self.accounting.min(MAX_SKILL_LEVEL),
        }
    }
}

impl Default for TradingSkills {
    fn default() -> Self {
        Self {
            broker_relations: MAX_SKILL_LEVEL,
            accounting: MAX_SKILL_LEVEL,
        }
    }
}

/// Effective fee percentages for one skill tuple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    /// Fee charged when placing an order, percent of order value
    pub broker_fee_pct: Decimal,
    /// Tax charged when a sell order fills, percent of sale value
    pub sales_tax_pct: Decimal,
}

impl FeeRates {
    /// Combined fee percentage applied to a completed sell
    pub fn total_pct(&self) -> Decimal {
        self.broker_fee_pct + self.sales_tax_pct
    }

    /// Combined fee rate as a fraction (e.g. 0.07 for 7%)
    pub fn total_rate(&self) -> Decimal {
        self.total_pct() / dec!(100)
    }
}

/// Deterministic skill-level to fee-rate lookup
pub struct FeeModel;

impl FeeModel {
    const BROKER_BASE_PCT: Decimal = dec!(3.0);
    const BROKER_REDUCTION_PER_LEVEL: Decimal = dec!(0.1);
    const BROKER_FLOOR_PCT: Decimal = dec!(2.5);

    const SALES_TAX_BASE_PCT: Decimal = dec!(8.0);
    const SALES_TAX_REDUCTION_PER_LEVEL: Decimal = dec!(0.11);
    const SALES_TAX_FLOOR_PCT: Decimal = dec!(4.5);

    /// Effective rates for a skill tuple.
    ///
    /// Both rates are monotonically non-increasing in skill level: level
    /// 0 yields the maximum published fee, level V the minimum.
    pub fn rates(skills: TradingSkills) -> FeeRates {
        let skills = skills.clamped();
        FeeRates {
            broker_fee_pct: Self::broker_fee_pct(skills.broker_relations),
            sales_tax_pct: Self::sales_tax_pct(skills.accounting),
        }
    }

    /// Broker fee: 3.0% base, -0.1% per Broker Relations level, floor 2.5%
    pub fn broker_fee_pct(broker_relations: u8) -> Decimal {
        let level = Decimal::from(broker_relations.min(MAX_SKILL_LEVEL));
        let rate = Self::BROKER_BASE_PCT - Self::BROKER_REDUCTION_PER_LEVEL * level;
        rate.max(Self::BROKER_FLOOR_PCT)
    }

    /// Sales tax: 8.0% base scaled by (1 - 0.11 x Accounting level), floor 4.5%
    pub fn sales_tax_pct(accounting: u8) -> Decimal {
        let level = Decimal::from(accounting.min(MAX_SKILL_LEVEL));
        let rate = Self::SALES_TAX_BASE_PCT
            * (Decimal::ONE - Self::SALES_TAX_REDUCTION_PER_LEVEL * level);
        rate.max(Self::SALES_TAX_FLOOR_PCT)
    }

    /// ISK needed to place a buy order at `market_price`, broker fee included
    pub fn effective_buy_price(market_price: Decimal, rates: &FeeRates) -> Decimal {
        market_price * (Decimal::ONE + rates.broker_fee_pct / dec!(100))
    }

    /// ISK actually received from a sell at `market_price`, after broker
    /// fee and sales tax
    pub fn effective_sell_price(market_price: Decimal, rates: &FeeRates) -> Decimal {
        market_price * (Decimal::ONE - rates.total_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn level_zero_yields_maximum_published_fees() {
        let rates = FeeModel::rates(TradingSkills::new(0, 0));
        assert_eq!(rates.broker_fee_pct, dec!(3.0));
        assert_eq!(rates.sales_tax_pct, dec!(8.0));
    }

    #[test]
    fn level_five_yields_minimum_published_fees() {
        let rates = FeeModel::rates(TradingSkills::new(5, 5));
        assert_eq!(rates.broker_fee_pct, dec!(2.5));
        assert_eq!(rates.sales_tax_pct, dec!(4.5));
    }

    #[test]
    fn rates_are_monotonically_non_increasing_in_skill() {
        for level in 1..=MAX_SKILL_LEVEL {
            assert!(FeeModel::broker_fee_pct(level) <= FeeModel::broker_fee_pct(level - 1));
            assert!(FeeModel::sales_tax_pct(level) <= FeeModel::sales_tax_pct(level - 1));
        }
    }

    #[test]
    fn levels_above_max_clamp_to_max() {
        assert_eq!(
            FeeModel::rates(TradingSkills::new(9, 9)),
            FeeModel::rates(TradingSkills::new(5, 5))
        );
    }

    #[test]
    fn effective_buy_price_adds_broker_fee() {
        let rates = FeeRates {
            broker_fee_pct: dec!(3.0),
            sales_tax_pct: dec!(8.0),
        };
        // 1M ISK order costs 1.03M to place at 3% broker fee
        assert_eq!(
            FeeModel::effective_buy_price(dec!(1000000), &rates),
            dec!(1030000)
        );
    }

    #[test]
    fn effective_sell_price_deducts_both_fees() {
        let rates = FeeRates {
            broker_fee_pct: dec!(2.5),
            sales_tax_pct: dec!(4.5),
        };
        assert_eq!(
            FeeModel::effective_sell_price(dec!(1000000), &rates),
            dec!(930000)
        );
    }
}
