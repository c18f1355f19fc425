//! Threshold-based change detection over tracked metrics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tracked dashboard metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    WalletBalance,
    ContractCount,
    ContractCollateral,
    WarehouseValue,
    IskInOrders,
}

impl MetricKind {
    /// All tracked metrics, each watched by an independent detector
    pub const ALL: [MetricKind; 5] = [
        MetricKind::WalletBalance,
        MetricKind::ContractCount,
        MetricKind::ContractCollateral,
        MetricKind::WarehouseValue,
        MetricKind::IskInOrders,
    ];
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricKind::WalletBalance => "wallet_balance",
            MetricKind::ContractCount => "contract_count",
            MetricKind::ContractCollateral => "contract_collateral",
            MetricKind::WarehouseValue => "warehouse_value",
            MetricKind::IskInOrders => "isk_in_orders",
        };
        write!(f, "{name}")
    }
}

/// Configured alert trigger for one metric; immutable at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub metric: MetricKind,
    /// Fire when `|current - baseline| >= absolute_delta`
    pub absolute_delta: Decimal,
}

/// Direction a metric moved in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    Increased,
    Decreased,
}

/// Emitted when a metric's delta crosses its configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: MetricKind,
    pub previous: Decimal,
    pub current: Decimal,
    pub delta: Decimal,
    pub direction: AlertDirection,
    pub observed_at: DateTime<Utc>,
}

/// Baseline/delta state machine for one metric.
///
/// Transitions happen only on successful observations: the caller must
/// not invoke [`ChangeDetector::observe`] after a failed fetch, which
/// leaves the baseline untouched and the detector silent but not
/// corrupted. Instances share no state; each metric owns its own.
#[derive(Debug)]
pub struct ChangeDetector {
    metric: MetricKind,
    threshold: Decimal,
    baseline: Option<Decimal>,
}

impl ChangeDetector {
    pub fn new(metric: MetricKind, threshold: Decimal) -> Self {
        Self {
            metric,
            threshold,
            baseline: None,
        }
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Last successfully observed value, if any
    pub fn baseline(&self) -> Option<Decimal> {
        self.baseline
    }

    /// Record a successful observation.
    ///
    /// If a baseline exists and `|current - baseline|` reaches the
    /// threshold, an alert is returned. The baseline is replaced with
    /// `current` in every case, alert or not.
    pub fn observe(&mut self, current: Decimal, observed_at: DateTime<Utc>) -> Option<Alert> {
        let alert = self.baseline.and_then(|previous| {
            let delta = current - previous;
            if delta.abs() >= self.threshold {
                Some(Alert {
                    metric: self.metric,
                    previous,
                    current,
                    delta,
                    direction: if delta >= Decimal::ZERO {
                        AlertDirection::Increased
                    } else {
                        AlertDirection::Decreased
                    },
                    observed_at,
                })
            } else {
                None
            }
        });
        self.baseline = Some(current);
        alert
    }
}
