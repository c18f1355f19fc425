//! Common test utilities and fixtures
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradehub_analyzer::common::errors::Result as CoreResult;
use tradehub_analyzer::{
    AssetLine, ContractSummary, DataProvider, PriceQuote, Side, TradeHub, WalletTransaction,
};

pub const TRITANIUM: u32 = 34;
pub const JITA_STATION: u64 = 60003760;
pub const AMARR_STATION: u64 = 60008494;

pub fn jita() -> TradeHub {
    TradeHub::new("Jita", 10000002, JITA_STATION)
}

pub fn amarr() -> TradeHub {
    TradeHub::new("Amarr", 10000043, AMARR_STATION)
}

/// Create a quote with sane defaults for testing
pub fn quote(
    item_id: u32,
    location_id: u64,
    side: Side,
    price: Decimal,
    volume: i64,
) -> PriceQuote {
    PriceQuote {
        item_id,
        location_id,
        side,
        price,
        volume_remain: volume,
        volume_total: volume,
        issued_at: Utc::now(),
        order_id: u64::from(item_id) * 10 + location_id % 10,
    }
}

/// A buy transaction `days_ago` days before `now`
pub fn buy_transaction(
    item_id: u32,
    location_id: u64,
    price: Decimal,
    quantity: i64,
    days_ago: i64,
    now: DateTime<Utc>,
) -> WalletTransaction {
    WalletTransaction {
        item_id,
        location_id,
        side: Side::Buy,
        unit_price: price,
        quantity,
        timestamp: now - Duration::days(days_ago),
        fee_paid: Decimal::ZERO,
    }
}

pub fn asset(item_id: u32, location_id: u64, quantity: i64) -> AssetLine {
    AssetLine {
        item_id,
        location_id,
        quantity,
    }
}

/// A market with a clean 30% Jita -> Amarr spread on Tritanium that
/// passes the default filters, plus a Jita sell quote for valuation
pub fn cross_hub_quotes() -> Vec<PriceQuote> {
    vec![
        quote(TRITANIUM, JITA_STATION, Side::Buy, dec!(1000000), 100),
        quote(TRITANIUM, JITA_STATION, Side::Sell, dec!(1250000), 80),
        quote(TRITANIUM, AMARR_STATION, Side::Sell, dec!(1300000), 100),
    ]
}

/// [`DataProvider`] with scripted per-call results.
///
/// Each section holds a queue of results consumed one per fetch; an
/// exhausted queue yields an empty/zero success so multi-tick tests only
/// script the sections they care about.
#[derive(Default)]
pub struct ScriptedProvider {
    quotes: Mutex<VecDeque<CoreResult<Vec<PriceQuote>>>>,
    transactions: Mutex<VecDeque<CoreResult<Vec<WalletTransaction>>>>,
    orders: Mutex<VecDeque<CoreResult<Vec<PriceQuote>>>>,
    assets: Mutex<VecDeque<CoreResult<Vec<AssetLine>>>>,
    balances: Mutex<VecDeque<CoreResult<Decimal>>>,
    contracts: Mutex<VecDeque<CoreResult<ContractSummary>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_quotes(&self, result: CoreResult<Vec<PriceQuote>>) {
        self.quotes.lock().unwrap().push_back(result);
    }

    pub fn push_transactions(&self, result: CoreResult<Vec<WalletTransaction>>) {
        self.transactions.lock().unwrap().push_back(result);
    }

    pub fn push_orders(&self, result: CoreResult<Vec<PriceQuote>>) {
        self.orders.lock().unwrap().push_back(result);
    }

    pub fn push_assets(&self, result: CoreResult<Vec<AssetLine>>) {
        self.assets.lock().unwrap().push_back(result);
    }

    pub fn push_balance(&self, result: CoreResult<Decimal>) {
        self.balances.lock().unwrap().push_back(result);
    }

    pub fn push_contracts(&self, result: CoreResult<ContractSummary>) {
        self.contracts.lock().unwrap().push_back(result);
    }

    fn next<T: Default>(queue: &Mutex<VecDeque<CoreResult<T>>>) -> CoreResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(T::default()))
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch_market_quotes(&self, _hubs: &[TradeHub]) -> CoreResult<Vec<PriceQuote>> {
        Self::next(&self.quotes)
    }

    async fn fetch_wallet_transactions(
        &self,
        _since: DateTime<Utc>,
    ) -> CoreResult<Vec<WalletTransaction>> {
        Self::next(&self.transactions)
    }

    async fn fetch_open_orders(&self) -> CoreResult<Vec<PriceQuote>> {
        Self::next(&self.orders)
    }

    async fn fetch_assets(&self, _hubs: &[TradeHub]) -> CoreResult<Vec<AssetLine>> {
        Self::next(&self.assets)
    }

    async fn fetch_wallet_balance(&self) -> CoreResult<Decimal> {
        Self::next(&self.balances)
    }

    async fn fetch_contract_summary(&self) -> CoreResult<ContractSummary> {
        Self::next(&self.contracts)
    }
}
