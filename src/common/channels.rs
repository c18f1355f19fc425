//! Channel plumbing between the engine and result consumers

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::traits::ResultSink;
use crate::analytics::{HubValuation, Opportunity};
use crate::engine::Alert;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// One published result from a refresh tick
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// Ranked arbitrage opportunities
    Opportunities(Vec<Opportunity>),
    /// Per-hub valuation summaries
    Valuation(Vec<HubValuation>),
    /// A metric crossed its alert threshold
    Alert(Alert),
}

/// Create a new analysis event channel with the default buffer size
pub fn create_event_channel() -> (mpsc::Sender<AnalysisEvent>, mpsc::Receiver<AnalysisEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new analysis event channel with a custom buffer size
pub fn create_event_channel_with_size(
    size: usize,
) -> (mpsc::Sender<AnalysisEvent>, mpsc::Receiver<AnalysisEvent>) {
    mpsc::channel(size)
}

/// [`ResultSink`] implementation that forwards events into an mpsc
/// channel.
///
/// A full or closed channel drops the event with a warning; publishing
/// must never fail the tick that produced the result.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<AnalysisEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<AnalysisEvent>) -> Self {
        Self { tx }
    }

    async fn send(&self, event: AnalysisEvent) {
        if let Err(e) = self.tx.send(event).await {
            warn!("dropping analysis event, channel closed: {e}");
        }
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn publish_opportunities(&self, opportunities: &[Opportunity]) {
        self.send(AnalysisEvent::Opportunities(opportunities.to_vec()))
            .await;
    }

    async fn publish_valuation(&self, valuation: &[HubValuation]) {
        self.send(AnalysisEvent::Valuation(valuation.to_vec())).await;
    }

    async fn publish_alert(&self, alert: &Alert) {
        self.send(AnalysisEvent::Alert(alert.clone())).await;
    }
}
