//! In-memory simulation configuration

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dists::Distribution;
use crate::error::ConfigError;

/// Slack tolerated on a routing row before it counts as oversubscribed.
pub const ROUTING_SUM_TOLERANCE: f64 = 1e-9;

/// Everything a replication needs, as data.
///
/// Mappings are keyed by node name and held in `BTreeMap`s so every
/// iteration that can influence sampling is deterministically ordered. A
/// node absent from `arrival_dists` receives no external arrivals; a node
/// absent from `priorities` gets the single class `[0]`. The residual
/// probability of each routing row (1 minus the row sum) is the chance of
/// leaving the network from that node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub arrival_dists: BTreeMap<String, Distribution>,
    pub service_dists: BTreeMap<String, Distribution>,
    pub servers: BTreeMap<String, usize>,
    #[serde(default)]
    pub priorities: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    pub patience_dists: BTreeMap<String, Distribution>,
    #[serde(default)]
    pub breakdown_dists: BTreeMap<String, Distribution>,
    #[serde(default)]
    pub repair_dists: BTreeMap<String, Distribution>,
    #[serde(default)]
    pub routing_matrix: BTreeMap<String, BTreeMap<String, f64>>,
    /// Replication horizon in seconds.
    pub sim_time: f64,
    /// Transient window discarded from statistics, in seconds.
    pub warmup: f64,
    /// Number of independent replications.
    pub batch_count: usize,
    /// Base seed; per-replication seeds are derived from it.
    pub seed: u64,
}

impl SimulationConfig {
    /// Start an empty network with the given horizon and seed, one batch and
    /// no warmup.
    pub fn new(sim_time: f64, seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            arrival_dists: BTreeMap::new(),
            service_dists: BTreeMap::new(),
            servers: BTreeMap::new(),
            priorities: BTreeMap::new(),
            patience_dists: BTreeMap::new(),
            breakdown_dists: BTreeMap::new(),
            repair_dists: BTreeMap::new(),
            routing_matrix: BTreeMap::new(),
            sim_time,
            warmup: 0.0,
            batch_count: 1,
            seed,
        }
    }

    /// Add a node with its server pool and service distribution.
    pub fn with_node(mut self, name: &str, servers: usize, service: Distribution) -> Self {
        self.nodes.push(name.to_string());
        self.servers.insert(name.to_string(), servers);
        self.service_dists.insert(name.to_string(), service);
        self
    }

    /// Give a node external arrivals.
    pub fn with_arrivals(mut self, node: &str, dist: Distribution) -> Self {
        self.arrival_dists.insert(node.to_string(), dist);
        self
    }

    /// Set a node's priority classes (smaller = higher priority; the first
    /// entry is assigned to external arrivals).
    pub fn with_priorities(mut self, node: &str, classes: &[u32]) -> Self {
        self.priorities.insert(node.to_string(), classes.to_vec());
        self
    }

    /// Make a node's customers impatient.
    pub fn with_patience(mut self, node: &str, dist: Distribution) -> Self {
        self.patience_dists.insert(node.to_string(), dist);
        self
    }

    /// Subject a node's servers to failures and repairs.
    pub fn with_breakdowns(mut self, node: &str, breakdown: Distribution, repair: Distribution) -> Self {
        self.breakdown_dists.insert(node.to_string(), breakdown);
        self.repair_dists.insert(node.to_string(), repair);
        self
    }

    /// Route a fraction of `from`'s completions to `to`.
    pub fn with_route(mut self, from: &str, to: &str, probability: f64) -> Self {
        self.routing_matrix
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), probability);
        self
    }

    pub fn with_warmup(mut self, warmup: f64) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_batches(mut self, batch_count: usize) -> Self {
        self.batch_count = batch_count;
        self
    }

    /// Check the whole record; the first problem found is returned. The
    /// engine runs this before scheduling anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        let mut known = BTreeSet::new();
        for name in &self.nodes {
            if !known.insert(name.as_str()) {
                return Err(ConfigError::DuplicateNode(name.clone()));
            }
        }

        check_keys(&known, "arrival_dists", self.arrival_dists.keys())?;
        check_keys(&known, "service_dists", self.service_dists.keys())?;
        check_keys(&known, "servers", self.servers.keys())?;
        check_keys(&known, "priorities", self.priorities.keys())?;
        check_keys(&known, "patience_dists", self.patience_dists.keys())?;
        check_keys(&known, "breakdown_dists", self.breakdown_dists.keys())?;
        check_keys(&known, "repair_dists", self.repair_dists.keys())?;
        check_keys(&known, "routing_matrix", self.routing_matrix.keys())?;
        check_keys(
            &known,
            "routing_matrix",
            self.routing_matrix.values().flat_map(|row| row.keys()),
        )?;

        for name in &self.nodes {
            if !self.service_dists.contains_key(name) {
                return Err(ConfigError::MissingServiceDistribution(name.clone()));
            }
            match self.servers.get(name) {
                Some(&count) if count > 0 => {}
                other => {
                    return Err(ConfigError::InvalidServerCount {
                        node: name.clone(),
                        count: other.copied().unwrap_or(0),
                    })
                }
            }
            if let Some(classes) = self.priorities.get(name) {
                if classes.is_empty() {
                    return Err(ConfigError::EmptyPriorityList(name.clone()));
                }
            }
            if self.breakdown_dists.contains_key(name) && !self.repair_dists.contains_key(name) {
                return Err(ConfigError::MissingRepairDistribution(name.clone()));
            }
        }

        for dist in self
            .arrival_dists
            .values()
            .chain(self.service_dists.values())
            .chain(self.patience_dists.values())
            .chain(self.breakdown_dists.values())
            .chain(self.repair_dists.values())
        {
            dist.validate()?;
        }

        for (origin, row) in &self.routing_matrix {
            let mut total = 0.0;
            for (target, &probability) in row {
                if !(0.0..=1.0).contains(&probability) || !probability.is_finite() {
                    return Err(ConfigError::InvalidRoutingProbability {
                        node: origin.clone(),
                        target: target.clone(),
                        probability,
                    });
                }
                total += probability;
            }
            if total > 1.0 + ROUTING_SUM_TOLERANCE {
                return Err(ConfigError::RoutingRowOverflow {
                    node: origin.clone(),
                    total,
                });
            }
        }

        if !self.sim_time.is_finite() || self.sim_time <= 0.0 {
            return Err(ConfigError::InvalidHorizon(self.sim_time));
        }
        if !self.warmup.is_finite() || self.warmup < 0.0 || self.warmup > self.sim_time {
            return Err(ConfigError::InvalidWarmup {
                warmup: self.warmup,
                sim_time: self.sim_time,
            });
        }
        if self.batch_count == 0 {
            return Err(ConfigError::ZeroBatchCount);
        }
        Ok(())
    }
}

fn check_keys<'a>(
    known: &BTreeSet<&str>,
    field: &'static str,
    mut keys: impl Iterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    match keys.find(|key| !known.contains(key.as_str())) {
        Some(unknown) => Err(ConfigError::UnknownNode {
            node: unknown.clone(),
            field,
        }),
        None => Ok(()),
    }
}
