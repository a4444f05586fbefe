//! Grid signals - main entry point
//!
//! This binary provides two subcommands:
//! - plan: Estimate a range and print a grid allocation plan
//! - monitor: Poll the spot price and alert on grid level crossings

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-signals")]
#[command(about = "Grid trading range estimation, planning, and crossing alerts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a one-shot grid plan for the configured symbol
    Plan {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/default.json")]
        config: String,

        /// Estimator method (overrides config file)
        #[arg(short, long)]
        estimator: Option<String>,

        /// Quote balance to allocate (overrides config file)
        #[arg(long)]
        quote: Option<f64>,

        /// Base balance to allocate (overrides config file)
        #[arg(long)]
        base: Option<f64>,

        /// Plan from a local candle CSV instead of fetching from Binance
        #[arg(long)]
        candles: Option<PathBuf>,
    },

    /// Watch the price and alert on grid level crossings
    Monitor {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/default.json")]
        config: String,

        /// Poll interval in seconds (overrides config file)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    // Initialize subscriber with both console and file
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Plan { .. } => "plan",
        Commands::Monitor { .. } => "monitor",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Plan {
            config,
            estimator,
            quote,
            base,
            candles,
        } => commands::plan::run(config, estimator, quote, base, candles),

        Commands::Monitor { config, interval } => commands::monitor::run(config, interval),
    }
}
