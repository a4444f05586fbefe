//! Grid Signals
//!
//! Range estimation, grid layout, and crossing alerts for spot grid trading.
//! Estimates a price range from recent candles, lays out evenly spaced
//! levels inside it, splits balances across them, and watches the live
//! price for level crossings. Advisory only: no orders are ever placed.

pub mod alert;
pub mod config;
pub mod data;
pub mod detector;
pub mod error;
pub mod estimator;
pub mod feed;
pub mod grid;
pub mod indicators;
pub mod planner;
pub mod types;

pub use config::Config;
pub use error::GridError;
pub use types::*;
