//! Batch replication driver
//!
//! Runs `batch_count` independent replications of a configuration, each with
//! a seed derived deterministically from the base seed, and aggregates the
//! per-replication metrics: sample means everywhere, a Student-t confidence
//! interval on throughput, and pooled duration summaries for waits and
//! sojourns. Any replication error fails the whole batch: runs are
//! deterministic, so a failure is reproducible and aggregating around it
//! would only mask a bug.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use queuenet_core::{replication_seed, Engine, RunResult, SimError, SimulationConfig};
use queuenet_metrics::{mean_and_ci, ConfidenceInterval, DurationSummary};

/// Aggregated outcome of a batch of replications. Per-node maps hold sample
/// means across replications; the duration summaries pool the individual
/// post-warmup samples of every replication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub replications: usize,
    /// Mean completed services per second across replications.
    pub throughput: f64,
    pub throughput_ci: ConfidenceInterval,
    pub mean_queue_length: BTreeMap<String, f64>,
    pub server_utilization: BTreeMap<String, f64>,
    pub service_completions: BTreeMap<String, f64>,
    pub reneging_probability: BTreeMap<String, f64>,
    pub mean_waiting_time: BTreeMap<String, f64>,
    pub mean_system_time: BTreeMap<String, f64>,
    /// Distribution of individual waits before service, per node.
    pub waiting_time: BTreeMap<String, DurationSummary>,
    /// Distribution of individual network sojourns, per exit node.
    pub system_time: BTreeMap<String, DurationSummary>,
}

/// Executes the replications of one configuration.
pub struct BatchDriver {
    config: SimulationConfig,
}

impl BatchDriver {
    /// Validates the configuration up front so a bad record fails before
    /// the first replication starts.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run every replication and aggregate.
    pub fn run(&self) -> Result<BatchResult, SimError> {
        let batches = self.config.batch_count;
        info!(batches, base_seed = self.config.seed, "batch run started");

        let mut runs: Vec<RunResult> = Vec::with_capacity(batches);
        let mut waiting_pool: BTreeMap<String, Vec<Duration>> = BTreeMap::new();
        let mut system_pool: BTreeMap<String, Vec<Duration>> = BTreeMap::new();

        for index in 0..batches {
            let seed = replication_seed(self.config.seed, index as u64);
            debug!(replication = index, seed, "replication started");
            let mut engine = Engine::new(&self.config, seed)?;
            let result = engine.run()?;

            for name in &self.config.nodes {
                let stats = &engine
                    .node(name)
                    .expect("configured nodes exist in the engine")
                    .stats;
                waiting_pool
                    .entry(name.clone())
                    .or_default()
                    .extend_from_slice(&stats.waiting_samples);
                system_pool
                    .entry(name.clone())
                    .or_default()
                    .extend_from_slice(&stats.system_samples);
            }
            runs.push(result);
        }

        let (throughput, throughput_ci) =
            mean_and_ci(&runs.iter().map(|r| r.throughput).collect::<Vec<_>>());

        let result = BatchResult {
            replications: batches,
            throughput,
            throughput_ci,
            mean_queue_length: aggregate(&self.config.nodes, &runs, |r, n| {
                r.mean_queue_length[n]
            }),
            server_utilization: aggregate(&self.config.nodes, &runs, |r, n| {
                r.server_utilization[n]
            }),
            service_completions: aggregate(&self.config.nodes, &runs, |r, n| {
                r.service_completions[n] as f64
            }),
            reneging_probability: aggregate(&self.config.nodes, &runs, |r, n| {
                r.reneging_probability[n]
            }),
            mean_waiting_time: aggregate(&self.config.nodes, &runs, |r, n| {
                r.mean_waiting_time[n]
            }),
            mean_system_time: aggregate(&self.config.nodes, &runs, |r, n| {
                r.mean_system_time[n]
            }),
            waiting_time: summarize_pool(waiting_pool),
            system_time: summarize_pool(system_pool),
        };
        info!(
            replications = result.replications,
            throughput = result.throughput,
            "batch run completed"
        );
        Ok(result)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

/// Run a full batch for `config`: validation, replications, aggregation.
pub fn simulate(config: &SimulationConfig) -> Result<BatchResult, SimError> {
    BatchDriver::new(config.clone())?.run()
}

fn aggregate(
    nodes: &[String],
    runs: &[RunResult],
    metric: impl Fn(&RunResult, &str) -> f64,
) -> BTreeMap<String, f64> {
    nodes
        .iter()
        .map(|name| {
            let values: Vec<f64> = runs.iter().map(|run| metric(run, name)).collect();
            (name.clone(), queuenet_metrics::mean(&values))
        })
        .collect()
}

fn summarize_pool(pool: BTreeMap<String, Vec<Duration>>) -> BTreeMap<String, DurationSummary> {
    pool.into_iter()
        .map(|(name, samples)| (name, DurationSummary::from_durations(&samples)))
        .collect()
}
