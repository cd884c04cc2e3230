//! Replication statistics for queuenet simulations.
//!
//! Two small toolboxes consumed by the batch driver and by anyone analysing
//! run output: point estimates with Student-t confidence intervals over
//! per-replication metrics, and HDR-histogram summaries of duration samples
//! (waiting times, network sojourns).

pub mod histogram;
pub mod summary;

pub use histogram::DurationSummary;
pub use summary::{mean, mean_and_ci, sample_std_dev, t_quantile_975, ConfidenceInterval};
