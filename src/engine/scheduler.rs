//! Periodic refresh driver
//!
//! One tick runs: provider fetch -> snapshot store update -> derived
//! views -> change detection -> result-sink emit. Scheduled and manual
//! ticks drain through a single `select!` loop, so at most one
//! reconciliation is ever in flight per metric. Every failure inside a
//! tick is caught and reported; nothing here may take the process down.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn};

use super::detector::{ChangeDetector, MetricKind};
use super::store::SnapshotStore;
use crate::analytics::{
    ArbitrageScanner, CostBasisEngine, FeeModel, HubValuation, OrderReconciler,
};
use crate::common::errors::{CoreError, Result};
use crate::common::timing::Stopwatch;
use crate::common::traits::{DataProvider, ResultSink};
use crate::common::types::{
    AssetLine, ItemId, LocationId, PriceQuote, Side, Snapshot, SnapshotKey, SnapshotPayload,
    WalletTransaction,
};
use crate::config::AppConfig;

/// Snapshots older than this are expired from the store
const SNAPSHOT_RETENTION_HOURS: i64 = 24;

/// Handle for requesting an out-of-cadence refresh.
///
/// A manual refresh runs the same tick sequence and restarts the
/// periodic countdown.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Request a refresh, waiting for queue space
    pub async fn refresh_now(&self) -> Result<()> {
        self.tx
            .send(())
            .await
            .map_err(|e| CoreError::ChannelSend(e.to_string()))
    }

    /// Request a refresh without waiting; returns false if the queue is
    /// full or the scheduler is gone
    pub fn try_refresh_now(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Outcome of one tick, for logging and tests
#[derive(Debug, Clone)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Opportunities published this tick
    pub opportunities: usize,
    /// Alerts published this tick
    pub alerts: usize,
    /// Sections whose fetch failed; their baselines and snapshots are
    /// untouched
    pub failed_fetches: Vec<String>,
    /// Set when the tick was aborted by invalid configuration
    pub rejected: Option<String>,
}

impl TickReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            opportunities: 0,
            alerts: 0,
            failed_fetches: Vec::new(),
            rejected: None,
        }
    }
}

/// Drives periodic and manual refresh cycles over a provider/sink pair
pub struct Scheduler<P, S> {
    provider: Arc<P>,
    sink: Arc<S>,
    config: AppConfig,
    store: SnapshotStore,
    detectors: HashMap<MetricKind, ChangeDetector>,
    refresh_rx: mpsc::Receiver<()>,
}

impl<P: DataProvider, S: ResultSink> Scheduler<P, S> {
    /// Build a scheduler and the handle used to trigger manual refreshes
    pub fn new(provider: Arc<P>, sink: Arc<S>, config: AppConfig) -> (Self, RefreshHandle) {
        let (tx, refresh_rx) = mpsc::channel(4);
        let detectors = config
            .alerts
            .iter()
            .map(|t| (t.metric, ChangeDetector::new(t.metric, t.absolute_delta)))
            .collect();
        (
            Self {
                provider,
                sink,
                config,
                store: SnapshotStore::new(),
                detectors,
                refresh_rx,
            },
            RefreshHandle { tx },
        )
    }

    /// Last successfully observed value for a metric, if any
    pub fn baseline(&self, metric: MetricKind) -> Option<Decimal> {
        self.detectors.get(&metric).and_then(|d| d.baseline())
    }

    /// Run the periodic loop until the owning task is cancelled.
    ///
    /// The first tick fires immediately; manual refreshes restart the
    /// countdown so the next scheduled tick is a full period away.
    pub async fn run(mut self) {
        let mut ticker = interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                Some(()) = self.refresh_rx.recv() => {
                    self.tick().await;
                    ticker.reset();
                }
            }
        }
    }

    /// Run one full refresh cycle.
    ///
    /// Idempotent entry point shared by the timer and the manual
    /// trigger. Never panics: fetch failures degrade to last-known-good
    /// data and invalid configuration rejects the tick outright.
    pub async fn tick(&mut self) -> TickReport {
        let started_at = Utc::now();
        let watch = Stopwatch::start("tick");
        let mut report = TickReport::new(started_at);

        if let Err(e) = self.config.validate() {
            warn!("tick rejected, previous state untouched: {e}");
            report.rejected = Some(e.to_string());
            report.duration = watch.finish();
            return report;
        }

        let fetched = self.fetch_all(started_at, &mut report).await;

        self.publish_opportunities(&mut report).await;
        let valuations = self.build_valuations(started_at);
        if !valuations.is_empty() {
            self.sink.publish_valuation(&valuations).await;
        }
        self.observe_metrics(&fetched, &valuations, &mut report)
            .await;

        let expired = self
            .store
            .prune_older_than(chrono::Duration::hours(SNAPSHOT_RETENTION_HOURS), started_at);
        if expired > 0 {
            warn!(expired, "expired stale snapshots past retention window");
        }

        report.duration = watch.finish();
        info!(
            opportunities = report.opportunities,
            alerts = report.alerts,
            failed = report.failed_fetches.len(),
            duration_ms = report.duration.as_millis() as u64,
            "tick complete"
        );
        report
    }

    /// Fetch every section concurrently, each under its own timeout.
    ///
    /// Successful sections replace their snapshot; failed ones are
    /// recorded on the report and leave the store untouched.
    async fn fetch_all(&mut self, taken_at: DateTime<Utc>, report: &mut TickReport) -> FetchFlags {
        let hubs = self.config.hubs.clone();
        let since = taken_at - chrono::Duration::days(i64::from(self.config.lookback_days));
        let limit = self.config.fetch_timeout();

        let (quotes, transactions, orders, assets, balance, contracts) = tokio::join!(
            fetch_section(SnapshotKey::MarketQuotes, limit, async {
                self.provider.fetch_market_quotes(&hubs).await
            }),
            fetch_section(SnapshotKey::WalletTransactions, limit, async {
                self.provider.fetch_wallet_transactions(since).await
            }),
            fetch_section(SnapshotKey::OpenOrders, limit, async {
                self.provider.fetch_open_orders().await
            }),
            fetch_section(SnapshotKey::Assets, limit, async {
                self.provider.fetch_assets(&hubs).await
            }),
            fetch_section(SnapshotKey::WalletBalance, limit, async {
                self.provider.fetch_wallet_balance().await
            }),
            fetch_section(SnapshotKey::Contracts, limit, async {
                self.provider.fetch_contract_summary().await
            }),
        );

        let mut flags = FetchFlags::default();
        flags.quotes = self.accept(SnapshotKey::MarketQuotes, taken_at, report, quotes.map(SnapshotPayload::Quotes));
        flags.transactions = self.accept(SnapshotKey::WalletTransactions, taken_at, report, transactions.map(SnapshotPayload::Transactions));
        flags.orders = self.accept(SnapshotKey::OpenOrders, taken_at, report, orders.map(SnapshotPayload::Orders));
        flags.assets = self.accept(SnapshotKey::Assets, taken_at, report, assets.map(SnapshotPayload::Assets));
        flags.balance = self.accept(SnapshotKey::WalletBalance, taken_at, report, balance.map(SnapshotPayload::Balance));
        flags.contracts = self.accept(SnapshotKey::Contracts, taken_at, report, contracts.map(SnapshotPayload::Contracts));
        flags
    }

    /// Store a fetched payload, or record the failure and keep the
    /// previous snapshot
    fn accept(
        &mut self,
        key: SnapshotKey,
        taken_at: DateTime<Utc>,
        report: &mut TickReport,
        payload: Result<SnapshotPayload>,
    ) -> bool {
        match payload {
            Ok(payload) => {
                self.store.insert(key, Snapshot::new(taken_at, payload));
                true
            }
            Err(e) => {
                warn!(section = %key, "fetch failed, keeping last-known-good snapshot: {e}");
                report.failed_fetches.push(key.to_string());
                false
            }
        }
    }

    async fn publish_opportunities(&mut self, report: &mut TickReport) {
        let Some(quotes) = self.stored_quotes(SnapshotKey::MarketQuotes) else {
            return;
        };
        match ArbitrageScanner::scan(quotes, &self.config.filters) {
            Ok(opportunities) => {
                report.opportunities = opportunities.len();
                self.sink.publish_opportunities(&opportunities).await;
            }
            Err(e) => warn!("opportunity scan failed: {e}"),
        }
    }

    /// Build per-hub valuations from the latest snapshots.
    ///
    /// Works from last-known-good data: a hub with no assets snapshot
    /// yet simply produces nothing.
    fn build_valuations(&self, now: DateTime<Utc>) -> Vec<HubValuation> {
        let Some(assets) = self.stored_assets() else {
            return Vec::new();
        };
        let transactions = self.stored_transactions().unwrap_or(&[]);
        let orders = self.stored_quotes(SnapshotKey::OpenOrders).unwrap_or(&[]);
        let quotes = self.stored_quotes(SnapshotKey::MarketQuotes).unwrap_or(&[]);
        let rates = FeeModel::rates(self.config.skills);

        let mut valuations = Vec::new();
        for hub in &self.config.hubs {
            let mut lines = Vec::new();
            for asset in assets.iter().filter(|a| a.location_id == hub.station_id) {
                let basis = CostBasisEngine::compute(
                    asset.item_id,
                    asset.location_id,
                    transactions,
                    self.config.lookback_days,
                    now,
                );
                let live_price =
                    best_price(quotes, asset.item_id, hub.station_id, Side::Sell);
                let cost_estimate =
                    best_price(quotes, asset.item_id, hub.station_id, Side::Buy);
                lines.push(OrderReconciler::reconcile(
                    asset,
                    orders,
                    &basis,
                    live_price,
                    cost_estimate,
                    self.config.target_margin_pct,
                    &rates,
                ));
            }
            if !lines.is_empty() {
                valuations.push(OrderReconciler::hub_valuation(hub, lines));
            }
        }
        valuations
    }

    /// Feed freshly fetched metrics through their detectors.
    ///
    /// Only metrics whose underlying fetches succeeded this tick are
    /// observed; a failed fetch leaves that metric's baseline untouched
    /// and fires nothing, however large the hypothetical delta.
    async fn observe_metrics(
        &mut self,
        fetched: &FetchFlags,
        valuations: &[HubValuation],
        report: &mut TickReport,
    ) {
        let observed_at = Utc::now();
        let mut observations: Vec<(MetricKind, Decimal)> = Vec::new();

        if fetched.balance {
            if let Some(Snapshot {
                payload: SnapshotPayload::Balance(balance),
                ..
            }) = self.store.get(SnapshotKey::WalletBalance)
            {
                observations.push((MetricKind::WalletBalance, *balance));
            }
        }
        if fetched.contracts {
            if let Some(Snapshot {
                payload: SnapshotPayload::Contracts(contracts),
                ..
            }) = self.store.get(SnapshotKey::Contracts)
            {
                observations.push((MetricKind::ContractCount, Decimal::from(contracts.open_count)));
                observations.push((MetricKind::ContractCollateral, contracts.total_collateral));
            }
        }
        if fetched.assets && fetched.quotes {
            let warehouse_value: Decimal = valuations.iter().map(|v| v.total_value).sum();
            observations.push((MetricKind::WarehouseValue, warehouse_value));
        }
        if fetched.orders {
            if let Some(orders) = self.stored_quotes(SnapshotKey::OpenOrders) {
                let in_orders: Decimal = orders
                    .iter()
                    .filter(|o| o.side == Side::Buy)
                    .map(PriceQuote::remaining_value)
                    .sum();
                observations.push((MetricKind::IskInOrders, in_orders));
            }
        }

        for (metric, value) in observations {
            let Some(detector) = self.detectors.get_mut(&metric) else {
                continue;
            };
            if let Some(alert) = detector.observe(value, observed_at) {
                info!(metric = %alert.metric, %alert.delta, "metric crossed threshold");
                self.sink.publish_alert(&alert).await;
                report.alerts += 1;
            }
        }
    }

    fn stored_quotes(&self, key: SnapshotKey) -> Option<&[PriceQuote]> {
        self.store.get(key).and_then(Snapshot::quotes)
    }

    fn stored_transactions(&self) -> Option<&[WalletTransaction]> {
        match self.store.get(SnapshotKey::WalletTransactions) {
            Some(Snapshot {
                payload: SnapshotPayload::Transactions(txs),
                ..
            }) => Some(txs),
            _ => None,
        }
    }

    fn stored_assets(&self) -> Option<&[AssetLine]> {
        match self.store.get(SnapshotKey::Assets) {
            Some(Snapshot {
                payload: SnapshotPayload::Assets(assets),
                ..
            }) => Some(assets),
            _ => None,
        }
    }
}

/// Which sections were fetched successfully this tick
#[derive(Debug, Default, Clone, Copy)]
struct FetchFlags {
    quotes: bool,
    transactions: bool,
    orders: bool,
    assets: bool,
    balance: bool,
    contracts: bool,
}

/// Apply the per-fetch timeout; an elapsed timeout is a failed fetch
async fn fetch_section<T>(
    key: SnapshotKey,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(format!(
            "fetch {key} exceeded {}s",
            limit.as_secs()
        ))),
    }
}

/// Best quote price for `(item, location)` on one side: lowest for
/// acquisition, highest for disposal
fn best_price(
    quotes: &[PriceQuote],
    item_id: ItemId,
    location_id: LocationId,
    side: Side,
) -> Option<Decimal> {
    let prices = quotes
        .iter()
        .filter(|q| q.item_id == item_id && q.location_id == location_id && q.side == side)
        .map(|q| q.price);
    match side {
        Side::Buy => prices.min(),
        Side::Sell => prices.max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::{MockDataProvider, MockResultSink};
    use crate::common::types::ContractSummary;
    use crate::engine::AlertThreshold;
    use rust_decimal_macros::dec;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.alerts = vec![AlertThreshold {
            metric: MetricKind::WalletBalance,
            absolute_delta: dec!(100000),
        }];
        config
    }

    fn provider_with_static_sections() -> MockDataProvider {
        let mut provider = MockDataProvider::new();
        provider
            .expect_fetch_market_quotes()
            .returning(|_| Ok(Vec::new()));
        provider
            .expect_fetch_wallet_transactions()
            .returning(|_| Ok(Vec::new()));
        provider.expect_fetch_open_orders().returning(|| Ok(Vec::new()));
        provider.expect_fetch_assets().returning(|_| Ok(Vec::new()));
        provider.expect_fetch_contract_summary().returning(|| {
            Ok(ContractSummary {
                open_count: 0,
                total_collateral: Decimal::ZERO,
            })
        });
        provider
    }

    fn quiet_sink() -> MockResultSink {
        let mut sink = MockResultSink::new();
        sink.expect_publish_opportunities().returning(|_| ());
        sink.expect_publish_valuation().returning(|_| ());
        sink.expect_publish_alert().returning(|_| ());
        sink
    }

    #[tokio::test]
    async fn failed_fetch_preserves_baseline_and_fires_no_alert() {
        let mut provider = provider_with_static_sections();
        provider
            .expect_fetch_wallet_balance()
            .times(1)
            .returning(|| Ok(dec!(1000000)));
        provider
            .expect_fetch_wallet_balance()
            .times(1)
            .returning(|| Err(CoreError::ProviderUnavailable("upstream down".into())));
        provider
            .expect_fetch_wallet_balance()
            .times(1)
            .returning(|| Ok(dec!(1150000)));

        let (mut scheduler, _handle) =
            Scheduler::new(Arc::new(provider), Arc::new(quiet_sink()), test_config());

        let first = scheduler.tick().await;
        assert_eq!(first.alerts, 0);
        assert_eq!(scheduler.baseline(MetricKind::WalletBalance), Some(dec!(1000000)));

        // Failed fetch: silent, baseline untouched.
        let second = scheduler.tick().await;
        assert_eq!(second.alerts, 0);
        assert_eq!(second.failed_fetches, vec!["wallet_balance".to_string()]);
        assert_eq!(scheduler.baseline(MetricKind::WalletBalance), Some(dec!(1000000)));

        // Recovery: delta measured against the original baseline.
        let third = scheduler.tick().await;
        assert_eq!(third.alerts, 1);
        assert_eq!(scheduler.baseline(MetricKind::WalletBalance), Some(dec!(1150000)));
    }

    #[tokio::test]
    async fn small_delta_fires_nothing_but_moves_baseline() {
        let mut provider = provider_with_static_sections();
        provider
            .expect_fetch_wallet_balance()
            .times(1)
            .returning(|| Ok(dec!(1000000)));
        provider
            .expect_fetch_wallet_balance()
            .times(1)
            .returning(|| Ok(dec!(1050000)));

        let (mut scheduler, _handle) =
            Scheduler::new(Arc::new(provider), Arc::new(quiet_sink()), test_config());

        scheduler.tick().await;
        let report = scheduler.tick().await;
        assert_eq!(report.alerts, 0);
        assert_eq!(scheduler.baseline(MetricKind::WalletBalance), Some(dec!(1050000)));
    }

    #[tokio::test]
    async fn invalid_configuration_rejects_the_tick_untouched() {
        let provider = MockDataProvider::new();
        let sink = MockResultSink::new();
        let mut config = test_config();
        config.filters.min_margin_pct = Some(dec!(500));
        config.filters.max_margin_pct = Some(dec!(20));

        let (mut scheduler, _handle) =
            Scheduler::new(Arc::new(provider), Arc::new(sink), config);
        let report = scheduler.tick().await;

        assert!(report.rejected.is_some());
        assert_eq!(report.opportunities, 0);
        assert_eq!(scheduler.baseline(MetricKind::WalletBalance), None);
    }

    #[tokio::test]
    async fn metrics_without_thresholds_never_alert() {
        let mut provider = provider_with_static_sections();
        provider
            .expect_fetch_wallet_balance()
            .returning(|| Ok(dec!(1000000)));

        let mut config = test_config();
        config.alerts.clear();

        let (mut scheduler, _handle) =
            Scheduler::new(Arc::new(provider), Arc::new(quiet_sink()), config);
        scheduler.tick().await;
        let report = scheduler.tick().await;
        assert_eq!(report.alerts, 0);
    }

    #[test]
    fn best_price_picks_lowest_buy_and_highest_sell() {
        let mk = |side, price: Decimal| PriceQuote {
            item_id: 34,
            location_id: 60003760,
            side,
            price,
            volume_remain: 10,
            volume_total: 10,
            issued_at: Utc::now(),
            order_id: 1,
        };
        let quotes = vec![
            mk(Side::Buy, dec!(100)),
            mk(Side::Buy, dec!(90)),
            mk(Side::Sell, dec!(120)),
            mk(Side::Sell, dec!(130)),
        ];
        assert_eq!(best_price(&quotes, 34, 60003760, Side::Buy), Some(dec!(90)));
        assert_eq!(best_price(&quotes, 34, 60003760, Side::Sell), Some(dec!(130)));
        assert_eq!(best_price(&quotes, 35, 60003760, Side::Buy), None);
    }
}
