//! # queuenet: queueing-network simulation
//!
//! A deterministic discrete-event simulator for networks of multi-server
//! queues, with priority classes, customer impatience, server breakdowns
//! and probabilistic routing.
//!
//! ## Quick start
//!
//! ```rust
//! use queuenet::prelude::*;
//!
//! let config = SimulationConfig::new(2000.0, 12345)
//!     .with_node("till", 1, Distribution::exponential(4.0).unwrap())
//!     .with_arrivals("till", Distribution::exponential(3.0).unwrap())
//!     .with_warmup(200.0)
//!     .with_batches(5);
//!
//! let report = simulate(&config).unwrap();
//! assert!(report.throughput_ci.contains(report.throughput));
//! ```
//!
//! The [`core`] crate holds the engine, [`metrics`] the statistical
//! toolbox; this crate ties them together with the batch replication
//! driver.

pub use queuenet_core as core;
pub use queuenet_metrics as metrics;

mod batch;

pub use batch::{simulate, BatchDriver, BatchResult};

/// Commonly used types and entry points.
pub mod prelude {
    pub use crate::batch::{simulate, BatchDriver, BatchResult};
    pub use queuenet_core::{
        Distribution, Engine, RunResult, SimError, SimTime, SimulationConfig,
    };
    pub use queuenet_metrics::{ConfidenceInterval, DurationSummary};
}
