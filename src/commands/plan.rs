//! Plan command implementation
//!
//! One-shot mode: estimate a range, lay out the grid, split the configured
//! balances across it, and print the plan. Nothing is ordered or persisted.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

use grid_signals::estimator::{config_by_name, create_estimator, estimate_with_fallback};
use grid_signals::feed::BinanceFeed;
use grid_signals::grid::{build_grid, GridSizing};
use grid_signals::planner::{plan_allocations, GridPlan};
use grid_signals::types::{Balance, GridSpec, RangeEstimate, Symbol};
use grid_signals::{data, Config};

pub fn run(
    config_path: String,
    estimator_override: Option<String>,
    quote_override: Option<f64>,
    base_override: Option<f64>,
    candles: Option<PathBuf>,
) -> Result<()> {
    info!("Starting grid planning");

    dotenv::dotenv().ok();

    let mut config =
        Config::load(&config_path).context(format!("Failed to load config from {}", config_path))?;

    if let Some(name) = estimator_override {
        info!("Overriding estimator to: {}", name);
        config.estimator = match config_by_name(&name) {
            Some(cfg) => cfg,
            None => bail!(
                "Unknown estimator: {}. Available estimators: atr, historical, volatility, regime",
                name
            ),
        };
    }

    if let Some(quote) = quote_override {
        config.balances.quote = quote;
    }
    if let Some(base) = base_override {
        config.balances.base = base;
    }
    config.validate()?;

    let symbol = config.symbol();

    // History and current price, from a local file or from Binance.
    let (series, current_price) = match candles {
        Some(path) => {
            info!("Loading candles from {}", path.display());
            let series = data::load_csv(&path)?;
            let current = series
                .last()
                .map(|c| c.close)
                .context("Candle file is empty")?;
            (series, current)
        }
        None => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            runtime.block_on(async {
                let feed = BinanceFeed::new();
                let series = feed
                    .klines(symbol.as_str(), &config.interval, config.history_limit)
                    .await?;
                let current = feed.current_price(symbol.as_str()).await?;
                Ok::<_, anyhow::Error>((series, current))
            })?
        }
    };

    let validation = data::validate_candles(&series);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!(
            "candle data failed validation: {}",
            validation.errors.join("; ")
        );
    }

    info!(
        "{}: {} candles, current price {:.2}",
        symbol,
        series.len(),
        current_price
    );

    let estimator = create_estimator(&config.estimator)?;
    let estimate = estimate_with_fallback(estimator.as_ref(), &series, current_price)?;

    let (count, sizing_warning) = config.grid.resolve(&estimate)?;
    if let Some(w) = &sizing_warning {
        warn!("{}", w);
    }

    let spec = build_grid(&estimate, count, current_price)?;
    let plan = plan_allocations(&spec, &config.balances);

    print_plan(
        &symbol,
        current_price,
        &estimate,
        &spec,
        &plan,
        &config.grid,
        &config.balances,
    );

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn print_plan(
    symbol: &Symbol,
    current_price: f64,
    estimate: &RangeEstimate,
    spec: &GridSpec,
    plan: &GridPlan,
    sizing: &GridSizing,
    balances: &Balance,
) {
    let base_asset = symbol.as_str().trim_end_matches("USDT");
    let net_profit = spec.net_profit_pct(sizing.fee_pct);

    println!("\n{}", "=".repeat(60));
    println!("GRID TRADING PLAN - {}", symbol);
    println!("{}", "=".repeat(60));
    println!(
        "Generated:          {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Current Price:      ${:.2}", current_price);
    println!(
        "Balances:           ${:.2} quote, {:.6} {} base",
        balances.quote, balances.base, base_asset
    );
    println!("Range Method:       {}", estimate.method);
    println!(
        "Price Range:        ${:.2} - ${:.2}",
        spec.min_price, spec.max_price
    );
    println!("Grid Levels:        {}", spec.levels.len());
    if let Some(n) = sizing.count {
        println!("Sizing:             fixed count {}", n);
    } else if let Some(n) = estimate.diagnostics.suggested_grid_count {
        println!("Sizing:             estimator-suggested count {}", n);
    } else {
        println!(
            "Sizing:             target {:.2}% profit per grid",
            sizing.target_profit_pct
        );
    }
    println!("Grid Step:          ${:.2}", spec.step());
    println!(
        "Net Profit/Grid:    {:.2}% (after {:.2}% round-trip fees)",
        net_profit,
        2.0 * sizing.fee_pct
    );
    if let Some(atr) = estimate.diagnostics.atr {
        println!("ATR:                ${:.2}", atr);
    }
    if let Some(std) = estimate.diagnostics.std_dev {
        println!("Return Std Dev:     {:.4}", std);
    }
    if let Some(strength) = estimate.diagnostics.trend_strength {
        println!("Trend Strength:     {:.4}", strength);
    }
    for warning in &estimate.diagnostics.warnings {
        println!("Warning:            {}", warning);
    }
    if net_profit <= 0.0 {
        println!("WARNING: net profit per grid is zero or negative at this density");
    }

    println!("\n{}", "-".repeat(60));
    println!(
        "BUY LEVELS ({} funded of {})",
        plan.buys().count(),
        plan.buy_levels
    );
    println!("{}", "-".repeat(60));
    if plan.buys().count() == 0 {
        println!("  (no quote balance allocated)");
    }
    for entry in plan.buys() {
        println!(
            "  BUY  @ ${:>10.2}   spend ${:>10.2}   for ~{:.6} {}",
            entry.price, entry.amount, entry.estimated_fill, base_asset
        );
    }

    println!("\n{}", "-".repeat(60));
    println!(
        "SELL LEVELS ({} funded of {})",
        plan.sells().count(),
        plan.sell_levels
    );
    println!("{}", "-".repeat(60));
    if plan.sells().count() == 0 {
        println!("  (no base balance allocated)");
    }
    for entry in plan.sells() {
        println!(
            "  SELL @ ${:>10.2}   sell {:>10.6} {}   for ~${:.2}",
            entry.price, entry.amount, base_asset, entry.estimated_fill
        );
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Committed:          ${:.2} quote, {:.6} {} base",
        plan.total_quote_committed(),
        plan.total_base_committed(),
        base_asset
    );
    println!("This is a plan only. No orders are placed.");
    println!("{}", "=".repeat(60));
}
