//! Deterministic discrete-event engine for networks of multi-server queues.
//!
//! The engine computes steady-state performance metrics (throughput,
//! utilization, queue length, waiting time, reneging probability) for a
//! configured network of service nodes under stochastic arrivals and
//! service, customer impatience, server breakdowns and repairs, and
//! probabilistic inter-node routing.
//!
//! # Architecture
//!
//! - [`SimulationConfig`] describes the network as data and validates it
//!   before anything is scheduled.
//! - [`Engine`] owns one replication: the clock, the [`scheduler`] event
//!   queue, the [`node`] state machines and the single shared [`Lcg`]
//!   stream. `Engine::run` drains events in `(time, class, id)` order and
//!   returns a [`RunResult`].
//! - Cancellation is flag-based: a scheduled event is invalidated through
//!   the queue and silently discarded when popped, never removed from the
//!   heap.
//!
//! # Determinism
//!
//! Two runs with the same configuration and seed produce bit-identical
//! results. Everything random flows through one LCG stream, every sampler
//! consumes exactly one draw per sample, and every iteration order that can
//! influence sampling is fixed (sorted routing rows, indexed node and server
//! tables, monotonic event ids as the final tie-breaker).
//!
//! # Example
//!
//! ```rust
//! use queuenet_core::{Distribution, Engine, SimulationConfig};
//!
//! let config = SimulationConfig::new(1000.0, 42)
//!     .with_node("till", 1, Distribution::exponential(4.0).unwrap())
//!     .with_arrivals("till", Distribution::exponential(3.0).unwrap())
//!     .with_warmup(100.0);
//!
//! let mut engine = Engine::new(&config, config.seed).unwrap();
//! let result = engine.run().unwrap();
//! assert!(result.server_utilization["till"] > 0.0);
//! ```

pub mod config;
pub mod dists;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod randomness;
pub mod scheduler;
pub mod stats;
pub mod time;
pub mod types;

pub use config::SimulationConfig;
pub use dists::Distribution;
pub use engine::{Engine, RunResult};
pub use error::{ConfigError, SimError};
pub use logging::{init_simulation_logging, init_simulation_logging_with_level};
pub use node::{Customer, Node, Server, ServerState};
pub use randomness::{replication_seed, splitmix64, Lcg};
pub use scheduler::{EventKind, EventQueue, ScheduledEvent};
pub use stats::NodeStats;
pub use time::SimTime;
pub use types::{CustomerId, EventId, NodeId};
