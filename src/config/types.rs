//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::analytics::{ScanFilters, TradingSkills};
use crate::common::channels::DEFAULT_CHANNEL_SIZE;
use crate::common::errors::{CoreError, Result};
use crate::common::types::TradeHub;
use crate::engine::AlertThreshold;

/// Main application configuration.
///
/// Read once per tick: edits take effect on the next tick, never in the
/// middle of one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Trade hubs to scan and value
    #[serde(default = "default_trade_hubs")]
    pub hubs: Vec<TradeHub>,
    /// Opportunity filter bounds
    #[serde(default = "default_filters")]
    pub filters: ScanFilters,
    /// Transaction lookback window for cost basis, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Period of the refresh tick, in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Per-fetch timeout, in seconds; an elapsed timeout is a failed fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Target margin for the minimum-profitable-sell-price calculation
    #[serde(default = "default_target_margin")]
    pub target_margin_pct: Decimal,
    /// Trading skill levels feeding the fee model
    #[serde(default)]
    pub skills: TradingSkills,
    /// Alert thresholds; metrics without an entry never alert
    #[serde(default)]
    pub alerts: Vec<AlertThreshold>,
    /// ESI provider settings
    #[serde(default)]
    pub esi: EsiConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hubs: default_trade_hubs(),
            filters: default_filters(),
            lookback_days: default_lookback_days(),
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            target_margin_pct: default_target_margin(),
            skills: TradingSkills::default(),
            alerts: Vec::new(),
            esi: EsiConfig::default(),
            settings: AppSettings::default(),
        }
    }
}

impl AppConfig {
    /// Validate the whole configuration; fails fast with a descriptive
    /// error so a bad config never reaches a tick half-applied.
    pub fn validate(&self) -> Result<()> {
        if self.hubs.is_empty() {
            return Err(CoreError::ConfigurationInvalid(
                "at least one trade hub must be configured".into(),
            ));
        }
        self.filters.validate()?;
        if self.lookback_days == 0 {
            return Err(CoreError::ConfigurationInvalid(
                "lookback_days must be at least 1".into(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(CoreError::ConfigurationInvalid(
                "refresh_interval_secs must be at least 1".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(CoreError::ConfigurationInvalid(
                "fetch_timeout_secs must be at least 1".into(),
            ));
        }
        if self.target_margin_pct < Decimal::ZERO {
            return Err(CoreError::ConfigurationInvalid(format!(
                "target_margin_pct must not be negative, got {}",
                self.target_margin_pct
            )));
        }
        for threshold in &self.alerts {
            if threshold.absolute_delta <= Decimal::ZERO {
                return Err(CoreError::ConfigurationInvalid(format!(
                    "alert threshold for {} must be positive, got {}",
                    threshold.metric, threshold.absolute_delta
                )));
            }
        }
        self.esi.validate()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// ESI data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiConfig {
    /// Base URL for the ESI REST API
    #[serde(default = "default_esi_base_url")]
    pub base_url: String,
    /// Character whose wallet, orders and assets are analyzed
    #[serde(default)]
    pub character_id: Option<u64>,
    /// Static bearer token for authenticated endpoints
    #[serde(default)]
    pub access_token: Option<String>,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            base_url: default_esi_base_url(),
            character_id: None,
            access_token: None,
            user_agent: default_user_agent(),
        }
    }
}

impl EsiConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| {
            CoreError::ConfigurationInvalid(format!("esi.base_url is not a valid URL: {e}"))
        })?;
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Buffer size of the analysis event channel
    #[serde(default = "default_channel_size")]
    pub event_channel_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_channel_size: default_channel_size(),
        }
    }
}

/// The five major trade hubs, the defaults the original dashboard tracked
pub fn default_trade_hubs() -> Vec<TradeHub> {
    vec![
        TradeHub::new("Jita", 10000002, 60003760),
        TradeHub::new("Amarr", 10000043, 60008494),
        TradeHub::new("Rens", 10000030, 60004588),
        TradeHub::new("Dodixie", 10000032, 60011866),
        TradeHub::new("Hek", 10000042, 60005686),
    ]
}

fn default_filters() -> ScanFilters {
    ScanFilters {
        min_margin_pct: Some(dec!(20)),
        max_margin_pct: Some(dec!(1500)),
        min_volume: Some(75),
        min_buy_price: Some(dec!(100000)),
    }
}

fn default_lookback_days() -> u32 {
    30
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_target_margin() -> Decimal {
    dec!(5)
}

fn default_esi_base_url() -> String {
    "https://esi.evetech.net/latest".to_string()
}

fn default_user_agent() -> String {
    "tradehub_analyzer/0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_size() -> usize {
    DEFAULT_CHANNEL_SIZE
}
