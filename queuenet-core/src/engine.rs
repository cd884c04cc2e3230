//! The replication engine
//!
//! One `Engine` owns everything a replication touches: the clock, the event
//! queue, the node table and the shared random stream. Time advances only by
//! jumping to the next scheduled event; each handler runs to completion
//! before the next event is popped, so a handler is atomic with respect to
//! every other event.
//!
//! Lifecycle: construction validates the configuration, builds the nodes and
//! schedules the initial events: an arrival at `t = 0` for every node with
//! an arrival distribution, a first breakdown per server where configured,
//! the warmup checkpoint and the termination sentinel. `run` then drains the
//! queue in `(time, class, id)` order until the horizon and folds the
//! post-warmup accumulators into a [`RunResult`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::metrics;
use crate::node::{Customer, Node, Route};
use crate::randomness::Lcg;
use crate::scheduler::{EventKind, EventQueue, ScheduledEvent};
use crate::time::SimTime;
use crate::types::{CustomerId, NodeId};

/// Steady-state metrics of a single replication, over the post-warmup
/// window. Per-node maps are keyed by node name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Completed services per second, summed over all nodes.
    pub throughput: f64,
    /// Time-average number of waiting customers.
    pub mean_queue_length: BTreeMap<String, f64>,
    /// Busy time as a fraction of non-down server time.
    pub server_utilization: BTreeMap<String, f64>,
    pub service_completions: BTreeMap<String, u64>,
    /// Reneged customers per admitted customer.
    pub reneging_probability: BTreeMap<String, f64>,
    /// Mean wait before service, in seconds.
    pub mean_waiting_time: BTreeMap<String, f64>,
    /// Mean network sojourn of customers exiting at each node, in seconds.
    pub mean_system_time: BTreeMap<String, f64>,
}

/// A single replication of the configured network.
pub struct Engine {
    time: SimTime,
    horizon: SimTime,
    warmup: SimTime,
    queue: EventQueue,
    nodes: Vec<Node>,
    rng: Lcg,
    next_customer: u64,
    steps: u64,
}

impl Engine {
    /// Validate `config`, build the network and schedule the initial events.
    pub fn new(config: &SimulationConfig, seed: u64) -> Result<Self, SimError> {
        config.validate()?;

        let index: BTreeMap<&str, usize> = config
            .nodes
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let default_classes = vec![0u32];
        let mut nodes = Vec::with_capacity(config.nodes.len());
        for (i, name) in config.nodes.iter().enumerate() {
            let classes = config.priorities.get(name).unwrap_or(&default_classes);
            // Row iteration over a BTreeMap is name-sorted, which fixes the
            // cumulative-probability walk order once and for all.
            let routes: Vec<Route> = config
                .routing_matrix
                .get(name)
                .map(|row| {
                    row.iter()
                        .map(|(target, &probability)| Route {
                            target: NodeId(index[target.as_str()]),
                            probability,
                        })
                        .collect()
                })
                .unwrap_or_default();

            nodes.push(Node::new(
                NodeId(i),
                name.clone(),
                config.servers[name],
                classes,
                config.service_dists[name],
                config.arrival_dists.get(name).copied(),
                config.patience_dists.get(name).copied(),
                config.breakdown_dists.get(name).copied(),
                config.repair_dists.get(name).copied(),
                routes,
            ));
        }

        let mut engine = Self {
            time: SimTime::zero(),
            horizon: SimTime::from_secs_f64(config.sim_time),
            warmup: SimTime::from_secs_f64(config.warmup),
            queue: EventQueue::new(),
            nodes,
            rng: Lcg::new(seed),
            next_customer: 0,
            steps: 0,
        };
        engine.schedule_initial_events()?;
        Ok(engine)
    }

    fn schedule_initial_events(&mut self) -> Result<(), SimError> {
        for i in 0..self.nodes.len() {
            if self.nodes[i].arrival.is_some() {
                let entry_class = self.nodes[i].entry_class;
                let customer = self.new_customer(entry_class, SimTime::zero());
                self.queue.push(
                    SimTime::zero(),
                    EventKind::Arrival {
                        node: NodeId(i),
                        customer,
                    },
                );
            }
        }
        for i in 0..self.nodes.len() {
            if let Some(breakdown) = self.nodes[i].breakdown {
                for _ in 0..self.nodes[i].servers.len() {
                    let at = SimTime::zero() + breakdown.sample_time(&mut self.rng)?;
                    if at < self.horizon {
                        self.queue.push(at, EventKind::Breakdown { node: NodeId(i) });
                    }
                }
            }
        }
        self.queue.push(self.warmup, EventKind::WarmupReset);
        self.queue.push(self.horizon, EventKind::Terminate);
        Ok(())
    }

    fn new_customer(&mut self, class: u32, now: SimTime) -> Customer {
        self.next_customer += 1;
        Customer::new(CustomerId(self.next_customer), class, now)
    }

    /// Drain the event queue up to the horizon and collect the result.
    pub fn run(&mut self) -> Result<RunResult, SimError> {
        info!(
            horizon = %self.horizon,
            warmup = %self.warmup,
            nodes = self.nodes.len(),
            "simulation run started"
        );
        loop {
            let Some(event) = self.queue.pop() else { break };
            if event.time > self.horizon {
                break;
            }
            if event.time < self.time {
                return Err(SimError::InvariantViolation(format!(
                    "{} at {} surfaced after the clock reached {}",
                    event.id, event.time, self.time
                )));
            }
            self.time = event.time;
            self.steps += 1;
            if self.steps % 10_000 == 0 {
                trace!(
                    steps = self.steps,
                    time = %self.time,
                    pending = self.queue.len(),
                    "dispatch progress"
                );
            }
            if self.dispatch(event)? {
                break;
            }
        }
        for node in &mut self.nodes {
            node.finalize(self.horizon);
        }
        info!(
            final_time = %self.time,
            events_dispatched = self.steps,
            "simulation run completed"
        );
        Ok(self.collect())
    }

    /// Handle one event. Returns `true` when the replication is over.
    fn dispatch(&mut self, event: ScheduledEvent) -> Result<bool, SimError> {
        let now = event.time;
        trace!(event = event.kind.label(), time = %now, id = %event.id, "dispatching");
        match event.kind {
            EventKind::WarmupReset => {
                for node in &mut self.nodes {
                    node.reset_stats(now);
                }
                debug!(time = %now, "transient window closed, statistics reset");
            }
            EventKind::Arrival { node, customer } => self.on_arrival(now, node, customer)?,
            EventKind::Departure {
                node,
                server,
                customer,
            } => self.on_departure(now, node, server, customer)?,
            EventKind::Routing { node, customer } => self.on_routing(now, node, customer)?,
            EventKind::Renege {
                node,
                class,
                customer,
            } => {
                let station = &mut self.nodes[node.0];
                station.renege(now, class, customer)?;
                metrics::record_renege(&station.name);
                metrics::record_queue_depth(&station.name, station.queue_length());
            }
            EventKind::Repair { node, server } => {
                self.nodes[node.0].repair_server(now, server, &mut self.queue, &mut self.rng)?;
            }
            EventKind::Breakdown { node } => self.on_breakdown(now, node)?,
            EventKind::Terminate => return Ok(true),
        }
        Ok(false)
    }

    fn on_arrival(
        &mut self,
        now: SimTime,
        node_id: NodeId,
        customer: Customer,
    ) -> Result<(), SimError> {
        {
            let station = &mut self.nodes[node_id.0];
            station.admit(now, customer, &mut self.queue, &mut self.rng)?;
            metrics::record_arrival(&station.name);
            metrics::record_queue_depth(&station.name, station.queue_length());
        }

        // The arrival process regenerates itself: every arrival at a node
        // with an arrival distribution books the next one. The draw always
        // happens; the event is only scheduled inside the horizon.
        if let Some(arrival) = self.nodes[node_id.0].arrival {
            let at = now + arrival.sample_time(&mut self.rng)?;
            if at < self.horizon {
                let entry_class = self.nodes[node_id.0].entry_class;
                let next = self.new_customer(entry_class, at);
                self.queue.push(
                    at,
                    EventKind::Arrival {
                        node: node_id,
                        customer: next,
                    },
                );
            }
        }
        Ok(())
    }

    fn on_departure(
        &mut self,
        now: SimTime,
        node_id: NodeId,
        server: usize,
        customer_id: CustomerId,
    ) -> Result<(), SimError> {
        let customer = self.nodes[node_id.0].complete(now, server, customer_id)?;
        metrics::record_completion(&self.nodes[node_id.0].name);
        // Routing happens as its own event at the same instant, after any
        // other same-time departures.
        self.queue.push(
            now,
            EventKind::Routing {
                node: node_id,
                customer,
            },
        );
        self.nodes[node_id.0].dispatch(now, &mut self.queue, &mut self.rng)
    }

    fn on_routing(
        &mut self,
        now: SimTime,
        node_id: NodeId,
        customer: Customer,
    ) -> Result<(), SimError> {
        // One draw per routing decision, empty rows included; the residual
        // probability mass means "leave the network".
        let u = self.rng.next_f64();
        let mut cumulative = 0.0;
        let mut chosen = None;
        for route in &self.nodes[node_id.0].routes {
            cumulative += route.probability;
            if u <= cumulative {
                chosen = Some(route.target);
                break;
            }
        }

        match chosen {
            Some(target) => {
                trace!(
                    from = %self.nodes[node_id.0].name,
                    to = %self.nodes[target.0].name,
                    customer = %customer.id,
                    "customer routed"
                );
                self.queue.push(
                    now,
                    EventKind::Arrival {
                        node: target,
                        customer,
                    },
                );
            }
            None => {
                let station = &mut self.nodes[node_id.0];
                let sojourn = now - customer.entered_system;
                station.stats.record_exit(sojourn);
                metrics::record_exit(&station.name);
                trace!(
                    node = %station.name,
                    customer = %customer.id,
                    sojourn = ?sojourn,
                    "customer left the network"
                );
            }
        }
        Ok(())
    }

    fn on_breakdown(&mut self, now: SimTime, node_id: NodeId) -> Result<(), SimError> {
        {
            let station = &mut self.nodes[node_id.0];
            if station
                .break_server(now, &mut self.queue, &mut self.rng)?
                .is_some()
            {
                metrics::record_breakdown(&station.name);
            }
        }

        // The failure process regenerates itself the same way arrivals do.
        if let Some(breakdown) = self.nodes[node_id.0].breakdown {
            let at = now + breakdown.sample_time(&mut self.rng)?;
            if at < self.horizon {
                self.queue.push(at, EventKind::Breakdown { node: node_id });
            }
        }
        Ok(())
    }

    fn collect(&self) -> RunResult {
        let window = self.observation_window();
        let mut mean_queue_length = BTreeMap::new();
        let mut server_utilization = BTreeMap::new();
        let mut service_completions = BTreeMap::new();
        let mut reneging_probability = BTreeMap::new();
        let mut mean_waiting_time = BTreeMap::new();
        let mut mean_system_time = BTreeMap::new();
        let mut completions_total: u64 = 0;

        for node in &self.nodes {
            completions_total += node.stats.completed_services;
            mean_queue_length.insert(node.name.clone(), node.stats.mean_queue_length(window));
            server_utilization.insert(node.name.clone(), node.stats.utilization(window));
            service_completions.insert(node.name.clone(), node.stats.completed_services);
            reneging_probability.insert(node.name.clone(), node.stats.reneging_probability());
            mean_waiting_time.insert(node.name.clone(), node.stats.mean_waiting_time());
            mean_system_time.insert(node.name.clone(), node.stats.mean_system_time());
        }

        let throughput = if window.is_zero() {
            0.0
        } else {
            completions_total as f64 / window.as_secs_f64()
        };

        RunResult {
            throughput,
            mean_queue_length,
            server_utilization,
            service_completions,
            reneging_probability,
            mean_waiting_time,
            mean_system_time,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The post-warmup window the statistics cover.
    pub fn observation_window(&self) -> Duration {
        self.horizon - self.warmup
    }

    /// Look a node up by name, for inspection after (or between) runs.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
