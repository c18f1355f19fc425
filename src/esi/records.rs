//! ESI wire records and checked conversion into domain types
//!
//! Conversions validate shape invariants and fail with
//! `MalformedRecord`; the client drops offending records with a warning
//! and keeps going.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{CoreError, Result};
use crate::common::types::{AssetLine, PriceQuote, Side, WalletTransaction};

/// One order from `GET /markets/{region_id}/orders/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiMarketOrder {
    pub order_id: u64,
    pub type_id: u32,
    pub location_id: u64,
    pub is_buy_order: bool,
    pub price: Decimal,
    pub volume_remain: i64,
    pub volume_total: i64,
    pub issued: DateTime<Utc>,
    #[serde(default)]
    pub min_volume: i64,
    #[serde(default)]
    pub duration: i32,
}

impl EsiMarketOrder {
    /// Convert into a quote from the engine's perspective.
    ///
    /// The side flips here: an ESI sell order (ask) is a price the
    /// engine can *buy* at, an ESI buy order (bid) one it can *sell*
    /// into.
    pub fn into_market_quote(self) -> Result<PriceQuote> {
        let quote = PriceQuote {
            item_id: self.type_id,
            location_id: self.location_id,
            side: if self.is_buy_order { Side::Sell } else { Side::Buy },
            price: self.price,
            volume_remain: self.volume_remain,
            volume_total: self.volume_total,
            issued_at: self.issued,
            order_id: self.order_id,
        };
        if !quote.is_well_formed() {
            return Err(CoreError::MalformedRecord(format!(
                "market order {} has price {} and volume {}/{}",
                self.order_id, quote.price, quote.volume_remain, quote.volume_total
            )));
        }
        Ok(quote)
    }
}

/// One order from `GET /characters/{character_id}/orders/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiCharacterOrder {
    pub order_id: u64,
    pub type_id: u32,
    pub location_id: u64,
    /// Absent for sell orders in ESI responses
    #[serde(default)]
    pub is_buy_order: bool,
    pub price: Decimal,
    pub volume_remain: i64,
    pub volume_total: i64,
    pub issued: DateTime<Utc>,
    #[serde(default)]
    pub escrow: Option<Decimal>,
    #[serde(default)]
    pub duration: i32,
}

impl EsiCharacterOrder {
    /// Convert into a quote keeping the order's own direction: an own
    /// buy order acquires units, so it stays `Side::Buy`.
    pub fn into_order_quote(self) -> Result<PriceQuote> {
        let quote = PriceQuote {
            item_id: self.type_id,
            location_id: self.location_id,
            side: if self.is_buy_order { Side::Buy } else { Side::Sell },
            price: self.price,
            volume_remain: self.volume_remain,
            volume_total: self.volume_total,
            issued_at: self.issued,
            order_id: self.order_id,
        };
        if !quote.is_well_formed() {
            return Err(CoreError::MalformedRecord(format!(
                "character order {} has price {} and volume {}/{}",
                self.order_id, quote.price, quote.volume_remain, quote.volume_total
            )));
        }
        Ok(quote)
    }
}

/// One record from `GET /characters/{character_id}/wallet/transactions/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiWalletTransaction {
    pub transaction_id: u64,
    pub type_id: u32,
    pub location_id: u64,
    pub is_buy: bool,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub journal_ref_id: Option<u64>,
}

impl EsiWalletTransaction {
    pub fn into_transaction(self) -> Result<WalletTransaction> {
        if self.unit_price <= Decimal::ZERO || self.quantity < 0 {
            return Err(CoreError::MalformedRecord(format!(
                "transaction {} has unit_price {} and quantity {}",
                self.transaction_id, self.unit_price, self.quantity
            )));
        }
        Ok(WalletTransaction {
            item_id: self.type_id,
            location_id: self.location_id,
            side: if self.is_buy { Side::Buy } else { Side::Sell },
            unit_price: self.unit_price,
            quantity: self.quantity,
            timestamp: self.date,
            fee_paid: Decimal::ZERO,
        })
    }
}

/// One record from `GET /characters/{character_id}/assets/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiAsset {
    pub item_id: u64,
    pub type_id: u32,
    pub location_id: u64,
    pub quantity: i64,
    #[serde(default)]
    pub location_flag: String,
}

impl EsiAsset {
    pub fn into_asset_line(self) -> Result<AssetLine> {
        if self.quantity < 0 {
            return Err(CoreError::MalformedRecord(format!(
                "asset {} has negative quantity {}",
                self.item_id, self.quantity
            )));
        }
        Ok(AssetLine {
            item_id: self.type_id,
            location_id: self.location_id,
            quantity: self.quantity,
        })
    }
}

/// One record from `GET /characters/{character_id}/contracts/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiContract {
    pub contract_id: u64,
    pub status: String,
    #[serde(rename = "type")]
    pub contract_type: String,
    #[serde(default)]
    pub collateral: Option<Decimal>,
}

impl EsiContract {
    /// Whether this contract still ties up attention or collateral
    pub fn is_open(&self) -> bool {
        matches!(self.status.as_str(), "outstanding" | "in_progress")
    }
}
