//! TradehubAnalyzer Library
//!
//! An analytics engine for multi-hub EVE Online trading: ingests market,
//! inventory and wallet snapshots and derives cross-hub arbitrage
//! opportunities, per-item true profitability and threshold-based change
//! alerts.

pub mod analytics;
pub mod common;
pub mod config;
pub mod engine;
pub mod esi;

// Re-export commonly used types
pub use common::channels::{create_event_channel, AnalysisEvent, ChannelSink};
pub use common::errors::{CoreError, Result};
pub use common::traits::{DataProvider, ResultSink};
pub use common::types::{
    AssetLine, ContractSummary, PriceQuote, Side, Snapshot, SnapshotKey, SnapshotPayload,
    TradeHub, WalletTransaction,
};
pub use config::{load_config, load_from_env, AppConfig};
pub use esi::EsiProvider;

// Analytics types
pub use analytics::{
    ArbitrageScanner, CostBasis, CostBasisEngine, EnrichedLine, FeeModel, FeeRates, HubValuation,
    Opportunity, OrderReconciler, ScanFilters, TradingSkills, ValuationSource,
};

// Engine types
pub use engine::{
    Alert, AlertDirection, AlertThreshold, ChangeDetector, MetricKind, RefreshHandle, Scheduler,
    SnapshotStore, TickReport,
};
