//! Monitor command implementation
//!
//! Polls the spot price on a fixed interval, runs crossing detection against
//! the active grid, and pushes an alert for every level that fires. Runs
//! until Ctrl+C.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info, warn};

use grid_signals::alert::Alerter;
use grid_signals::data::{append_trimmed, validate_candles};
use grid_signals::detector::SignalDetector;
use grid_signals::estimator::create_estimator;
use grid_signals::feed::BinanceFeed;
use grid_signals::types::{Candle, Symbol};
use grid_signals::Config;

struct Monitor {
    symbol: Symbol,
    feed: BinanceFeed,
    detector: SignalDetector,
    alerter: Alerter,
    series: Vec<Candle>,
    max_series_len: usize,
}

impl Monitor {
    async fn new(config: &Config) -> Result<Self> {
        let symbol = config.symbol();
        let feed = BinanceFeed::new();

        let series = feed
            .klines(symbol.as_str(), &config.interval, config.history_limit)
            .await
            .context("Failed to fetch startup history")?;

        let validation = validate_candles(&series);
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if !validation.is_valid() {
            bail!(
                "startup history failed validation: {}",
                validation.errors.join("; ")
            );
        }

        let current_price = feed
            .current_price(symbol.as_str())
            .await
            .context("Failed to fetch current price")?;

        info!(
            "{}: {} candles, current price {:.2}",
            symbol,
            series.len(),
            current_price
        );

        let estimator = create_estimator(&config.estimator)?;
        let detector = SignalDetector::new(
            symbol.clone(),
            estimator,
            config.grid.clone(),
            config.monitor.regen_bounds,
            &series,
            current_price,
        )?;

        let net = detector.spec().net_profit_pct(config.grid.fee_pct);
        if net <= 0.0 {
            warn!(
                "net profit per grid is {:.2}% at this density; crossings may not be worth acting on",
                net
            );
        }

        let alerter = Alerter::from_webhook_url(config.alerts.webhook_url.clone());

        Ok(Monitor {
            symbol,
            feed,
            detector,
            alerter,
            series,
            max_series_len: config.monitor.max_series_len,
        })
    }

    /// One poll cycle: fetch the price, extend the series, detect crossings,
    /// deliver alerts.
    async fn run_cycle(&mut self) -> Result<()> {
        let price = match self.feed.current_price(self.symbol.as_str()).await {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: price fetch failed, skipping tick: {}", self.symbol, e);
                return Ok(());
            }
        };

        let now = Utc::now();
        // The sample joins the series before detection so a regenerated
        // range always contains it, whichever estimator is configured.
        append_trimmed(
            &mut self.series,
            Candle::new_unchecked(now, price, price, price, price, 0.0),
            self.max_series_len,
        );

        let events = self.detector.on_price(price, now, &self.series);
        for event in &events {
            if let Err(e) = self.alerter.send(event).await {
                error!("Alert delivery failed: {}", e);
            }
        }

        Ok(())
    }
}

pub fn run(config_path: String, interval_override: Option<u64>) -> Result<()> {
    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, interval_override))
}

async fn run_async(config_path: String, interval_override: Option<u64>) -> Result<()> {
    let mut config =
        Config::load(&config_path).context(format!("Failed to load config from {}", config_path))?;
    if let Some(secs) = interval_override {
        config.monitor.poll_interval_secs = secs;
    }
    config.validate()?;

    info!("{}", "=".repeat(60));
    info!("GRID SIGNAL MONITOR - {}", config.symbol());
    info!(
        "Candle interval: {} | Poll every {}s | History: {} bars",
        config.interval, config.monitor.poll_interval_secs, config.history_limit
    );
    info!("{}", "=".repeat(60));

    let mut monitor = Monitor::new(&config).await?;
    let spec = monitor.detector.spec();
    info!(
        "Watching {} levels in [{:.2}, {:.2}]",
        spec.levels.len(),
        spec.min_price,
        spec.max_price
    );

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let flag = shutdown_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            flag.store(true, Ordering::SeqCst);
            let _ = shutdown_tx.send(()).await;
        }
    });

    let mut poll_interval = interval(Duration::from_secs(config.monitor.poll_interval_secs));

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                if shutdown_flag.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = monitor.run_cycle().await {
                    error!("Monitoring cycle error: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutting down monitor loop");
                break;
            }
        }
    }

    info!("Monitoring session ended.");
    Ok(())
}
