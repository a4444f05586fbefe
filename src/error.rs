//! Typed errors for the grid core

use thiserror::Error;

/// Errors produced by range estimation, grid construction, and the
/// collaborator boundaries.
///
/// Inside the monitoring loop none of these are fatal: a failing tick is
/// skipped and the next poll retries (see the detector and monitor command).
#[derive(Debug, Error)]
pub enum GridError {
    /// Series shorter than the estimator's required window.
    #[error("insufficient data: {needed} bars required, {available} available")]
    InsufficientData { needed: usize, available: usize },

    /// Bounds that cannot hold a grid (min >= max, non-positive, or
    /// non-finite).
    #[error("invalid range: min={min}, max={max}")]
    InvalidRange { min: f64, max: f64 },

    /// Transport or payload failure from a price collaborator.
    #[error("price fetch failed: {0}")]
    FetchFailure(String),

    /// The alert sink could not deliver a notification.
    #[error("alert delivery failed: {0}")]
    AlertDeliveryFailure(String),
}
