//! TradehubAnalyzer - Main Entry Point
//!
//! Drives periodic market/inventory refreshes over the configured trade
//! hubs and logs the derived opportunities, valuations and alerts.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tradehub_analyzer::common::channels::create_event_channel_with_size;
use tradehub_analyzer::{load_config, AnalysisEvent, ChannelSink, EsiProvider, Scheduler};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Comma-separated hub names to scan (defaults to all configured)
    #[arg(long)]
    hubs: Option<String>,

    /// Run a single refresh and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenvy::dotenv().ok();

    info!("Starting TradehubAnalyzer");
    info!("Configuration file: {}", args.config);

    let mut config = load_config(Some(&args.config))?;
    if let Some(selected) = &args.hubs {
        let names: Vec<&str> = selected.split(',').map(str::trim).collect();
        config.hubs.retain(|hub| names.contains(&hub.name.as_str()));
        anyhow::ensure!(
            !config.hubs.is_empty(),
            "no configured hub matches --hubs {selected}"
        );
    }
    info!(
        hubs = config.hubs.len(),
        refresh_secs = config.refresh_interval_secs,
        "configuration loaded"
    );

    let provider = Arc::new(EsiProvider::new(&config.esi)?);
    let (tx, mut rx) = create_event_channel_with_size(config.settings.event_channel_size);
    let sink = Arc::new(ChannelSink::new(tx));
    let (mut scheduler, _refresh) = Scheduler::new(provider, sink, config);

    // Consumer task: render published results into the log.
    let consumer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AnalysisEvent::Opportunities(opportunities) => {
                    info!("{} opportunities this tick", opportunities.len());
                    for opp in opportunities.iter().take(10) {
                        info!(
                            item = opp.item_id,
                            buy = %opp.buy_price,
                            sell = %opp.sell_price,
                            margin_pct = %opp.margin_pct,
                            "opportunity {} -> {}",
                            opp.buy_location,
                            opp.sell_location
                        );
                    }
                }
                AnalysisEvent::Valuation(valuations) => {
                    for valuation in &valuations {
                        info!(
                            hub = %valuation.hub,
                            items = valuation.item_count,
                            value = %valuation.total_value,
                            profit = %valuation.expected_profit,
                            "hub valuation"
                        );
                    }
                }
                AnalysisEvent::Alert(alert) => {
                    warn!(
                        metric = %alert.metric,
                        delta = %alert.delta,
                        previous = %alert.previous,
                        current = %alert.current,
                        "ALERT: tracked metric moved past threshold"
                    );
                }
            }
        }
    });

    if args.once {
        let report = scheduler.tick().await;
        info!(
            opportunities = report.opportunities,
            alerts = report.alerts,
            failed = report.failed_fetches.len(),
            "single refresh complete"
        );
    } else {
        tokio::select! {
            _ = scheduler.run() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, cleaning up...");
            }
        }
    }

    consumer.abort();
    Ok(())
}
