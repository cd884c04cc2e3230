//! Error types for the simulation engine

use thiserror::Error;

/// Rejected configuration, reported before any event is scheduled.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("node list is empty")]
    NoNodes,

    #[error("duplicate node name `{0}`")]
    DuplicateNode(String),

    #[error("unknown node `{node}` referenced in `{field}`")]
    UnknownNode { node: String, field: &'static str },

    #[error("node `{0}` has no service distribution")]
    MissingServiceDistribution(String),

    #[error("node `{node}` needs a positive server count, got {count}")]
    InvalidServerCount { node: String, count: usize },

    #[error("node `{0}` has an empty priority class list")]
    EmptyPriorityList(String),

    #[error("node `{0}` has a breakdown distribution but no repair distribution")]
    MissingRepairDistribution(String),

    #[error("routing probability {probability} from `{node}` to `{target}` is outside [0, 1]")]
    InvalidRoutingProbability {
        node: String,
        target: String,
        probability: f64,
    },

    #[error("routing row for `{node}` sums to {total}, which exceeds 1")]
    RoutingRowOverflow { node: String, total: f64 },

    #[error("simulation horizon must be a positive finite number of seconds, got {0}")]
    InvalidHorizon(f64),

    #[error("warmup {warmup} is outside [0, {sim_time}]")]
    InvalidWarmup { warmup: f64, sim_time: f64 },

    #[error("batch count must be positive")]
    ZeroBatchCount,

    #[error("exponential rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("constant duration must be non-negative and finite, got {0}")]
    InvalidConstant(f64),
}

/// Top-level error type for a simulation run.
///
/// `InvariantViolation` and `NumericDomain` indicate a bug in the engine or
/// its inputs; they abort the current replication and are never swallowed.
/// Runs are deterministic, so every failure is reproducible from the same
/// configuration and seed.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation invariant violated: {0}")]
    InvariantViolation(String),

    #[error("numeric domain error: {0}")]
    NumericDomain(String),
}
