//! Service nodes: waiting lines, server pool and local state transitions
//!
//! A node owns its customers while they wait (one FIFO line per priority
//! class) and while they are in service (inside the busy server's state).
//! Everything else about a customer's journey is the engine's business; the
//! handlers here receive the event queue and the shared random stream by
//! mutable reference, mutate local state, and schedule the follow-up events
//! they are responsible for.
//!
//! Every handler folds the elapsed interval into the node's statistics
//! integrals before changing any tracked quantity.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::dists::Distribution;
use crate::error::SimError;
use crate::randomness::Lcg;
use crate::scheduler::{EventKind, EventQueue};
use crate::stats::NodeStats;
use crate::time::SimTime;
use crate::types::{CustomerId, EventId, NodeId};

/// One customer travelling through the network.
///
/// Owned by exactly one place at a time: a waiting line, a busy server, or
/// an in-flight routing/arrival event. The pending renege is referenced by
/// event id rather than owned, so there is no ownership cycle to break.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    /// Priority class; smaller values are served first.
    pub class: u32,
    /// When the customer first entered the network.
    pub entered_system: SimTime,
    /// When the customer entered its current node; reset on every arrival.
    pub entered_node: SimTime,
    /// Pending renege event, cancelled when the customer leaves the line.
    pub renege_event: Option<EventId>,
}

impl Customer {
    pub fn new(id: CustomerId, class: u32, now: SimTime) -> Self {
        Self {
            id,
            class,
            entered_system: now,
            entered_node: now,
            renege_event: None,
        }
    }
}

/// State of one service channel.
///
/// Carrying the customer and its departure event inside the `Busy` variant
/// makes the state machine's core invariant structural: a busy server always
/// holds exactly one customer and one pending departure, and an idle or down
/// server holds neither.
#[derive(Debug)]
pub enum ServerState {
    Idle,
    Busy {
        customer: Customer,
        departure: EventId,
    },
    Down,
}

#[derive(Debug)]
pub struct Server {
    pub state: ServerState,
}

impl Server {
    pub fn new() -> Self {
        Self {
            state: ServerState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ServerState::Idle)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ServerState::Busy { .. })
    }

    pub fn is_down(&self) -> bool {
        matches!(self.state, ServerState::Down)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved routing entry; rows are sorted by target name at build time so
/// the cumulative-probability walk is deterministic.
#[derive(Debug, Clone)]
pub struct Route {
    pub target: NodeId,
    pub probability: f64,
}

/// A multi-server station with priority waiting lines.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub servers: Vec<Server>,
    lines: BTreeMap<u32, VecDeque<Customer>>,
    pub service: Distribution,
    pub arrival: Option<Distribution>,
    pub patience: Option<Distribution>,
    pub breakdown: Option<Distribution>,
    pub repair: Option<Distribution>,
    pub routes: Vec<Route>,
    /// Class assigned to external arrivals (first configured class).
    pub entry_class: u32,
    pub stats: NodeStats,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: NodeId,
        name: String,
        server_count: usize,
        classes: &[u32],
        service: Distribution,
        arrival: Option<Distribution>,
        patience: Option<Distribution>,
        breakdown: Option<Distribution>,
        repair: Option<Distribution>,
        routes: Vec<Route>,
    ) -> Self {
        Self {
            id,
            name,
            servers: (0..server_count).map(|_| Server::new()).collect(),
            lines: classes.iter().map(|&c| (c, VecDeque::new())).collect(),
            service,
            arrival,
            patience,
            breakdown,
            repair,
            routes,
            entry_class: classes.first().copied().unwrap_or(0),
            stats: NodeStats::new(server_count),
        }
    }

    /// Total customers waiting, across all classes.
    pub fn queue_length(&self) -> usize {
        self.lines.values().map(VecDeque::len).sum()
    }

    pub fn busy_servers(&self) -> usize {
        self.servers.iter().filter(|s| s.is_busy()).count()
    }

    /// Customers currently at the node, waiting or in service.
    pub fn population(&self) -> usize {
        self.queue_length() + self.busy_servers()
    }

    fn touch(&mut self, now: SimTime) {
        let queue_len = self.queue_length();
        self.stats.advance(now, queue_len, &self.servers);
    }

    /// Let a customer in: count the arrival, arm its patience timer, place
    /// it at the tail of its class line, then try to put a server to work.
    pub(crate) fn admit(
        &mut self,
        now: SimTime,
        mut customer: Customer,
        queue: &mut EventQueue,
        rng: &mut Lcg,
    ) -> Result<(), SimError> {
        self.touch(now);
        customer.entered_node = now;
        self.stats.arrivals_total += 1;

        if let Some(patience) = self.patience {
            let limit = patience.sample_time(rng)?;
            let renege = queue.push(
                now + limit,
                EventKind::Renege {
                    node: self.id,
                    class: customer.class,
                    customer: customer.id,
                },
            );
            customer.renege_event = Some(renege);
        }

        trace!(
            node = %self.name,
            customer = %customer.id,
            class = customer.class,
            "customer admitted"
        );
        self.lines.entry(customer.class).or_default().push_back(customer);
        self.dispatch(now, queue, rng)
    }

    /// Pair idle servers with waiting customers: lowest-index idle server,
    /// head of the lowest-numbered non-empty class line. Entering service
    /// cancels the customer's renege and records its wait.
    pub(crate) fn dispatch(
        &mut self,
        now: SimTime,
        queue: &mut EventQueue,
        rng: &mut Lcg,
    ) -> Result<(), SimError> {
        loop {
            let Some(server_idx) = self.servers.iter().position(Server::is_idle) else {
                return Ok(());
            };
            if self.lines.values().all(VecDeque::is_empty) {
                return Ok(());
            }

            self.touch(now);
            let mut customer = self
                .pop_waiting()
                .expect("a non-empty line was just observed");
            if let Some(renege) = customer.renege_event.take() {
                queue.invalidate(renege);
            }

            let wait = now - customer.entered_node;
            self.stats.record_wait(wait);

            let service_time = self.service.sample_time(rng)?;
            let departure = queue.push(
                now + service_time,
                EventKind::Departure {
                    node: self.id,
                    server: server_idx,
                    customer: customer.id,
                },
            );
            trace!(
                node = %self.name,
                server = server_idx,
                customer = %customer.id,
                wait = ?wait,
                service = ?service_time,
                "service started"
            );
            self.servers[server_idx].state = ServerState::Busy { customer, departure };
        }
    }

    fn pop_waiting(&mut self) -> Option<Customer> {
        self.lines
            .values_mut()
            .find_map(|line| line.pop_front())
    }

    /// Normal completion: the server goes idle and the customer is handed
    /// back to the engine for routing. A departure that reaches a server in
    /// any other state slipped past invalidation and is a bug.
    pub(crate) fn complete(
        &mut self,
        now: SimTime,
        server_idx: usize,
        customer_id: CustomerId,
    ) -> Result<Customer, SimError> {
        if server_idx >= self.servers.len() {
            return Err(SimError::InvariantViolation(format!(
                "departure addressed server {server_idx} of `{}`, which has {} servers",
                self.name,
                self.servers.len()
            )));
        }
        self.touch(now);
        match std::mem::replace(&mut self.servers[server_idx].state, ServerState::Idle) {
            ServerState::Busy { customer, .. } if customer.id == customer_id => {
                self.stats.completed_services += 1;
                trace!(
                    node = %self.name,
                    server = server_idx,
                    customer = %customer.id,
                    "service completed"
                );
                Ok(customer)
            }
            other => Err(SimError::InvariantViolation(format!(
                "departure of {customer_id} hit server {server_idx} of `{}` in state {other:?}",
                self.name
            ))),
        }
    }

    /// A waiting customer abandons the line. Stale reneges never get here
    /// (they are discarded on pop), so a missing customer is a bug.
    pub(crate) fn renege(
        &mut self,
        now: SimTime,
        class: u32,
        customer_id: CustomerId,
    ) -> Result<(), SimError> {
        self.touch(now);
        let removed = match self.lines.get_mut(&class) {
            Some(line) => match line.iter().position(|c| c.id == customer_id) {
                Some(idx) => line.remove(idx),
                None => None,
            },
            None => None,
        };
        let Some(customer) = removed else {
            return Err(SimError::InvariantViolation(format!(
                "renege of {customer_id} found no such customer in class {class} of `{}`",
                self.name
            )));
        };

        self.stats.reneged_total += 1;
        debug!(
            node = %self.name,
            customer = %customer.id,
            waited = ?(now - customer.entered_node),
            "customer reneged"
        );
        Ok(())
    }

    /// Take the lowest-index working server down. An interrupted customer
    /// goes back to the head of its class line with a fresh patience timer;
    /// its pending departure is invalidated. Returns the index of the failed
    /// server, or `None` when every server is already down.
    pub(crate) fn break_server(
        &mut self,
        now: SimTime,
        queue: &mut EventQueue,
        rng: &mut Lcg,
    ) -> Result<Option<usize>, SimError> {
        let Some(server_idx) = self.servers.iter().position(|s| !s.is_down()) else {
            return Ok(None);
        };

        self.touch(now);
        let previous = std::mem::replace(&mut self.servers[server_idx].state, ServerState::Down);
        if let ServerState::Busy { mut customer, departure } = previous {
            queue.invalidate(departure);
            customer.renege_event = None;
            if let Some(patience) = self.patience {
                let limit = patience.sample_time(rng)?;
                let renege = queue.push(
                    now + limit,
                    EventKind::Renege {
                        node: self.id,
                        class: customer.class,
                        customer: customer.id,
                    },
                );
                customer.renege_event = Some(renege);
            }
            debug!(
                node = %self.name,
                server = server_idx,
                customer = %customer.id,
                "service interrupted by breakdown, customer requeued at head"
            );
            self.lines
                .entry(customer.class)
                .or_default()
                .push_front(customer);
        } else {
            debug!(node = %self.name, server = server_idx, "idle server broke down");
        }

        let Some(repair) = self.repair else {
            // Validation requires repair alongside breakdown.
            return Err(SimError::InvariantViolation(format!(
                "server of `{}` broke down but the node has no repair distribution",
                self.name
            )));
        };
        let delay = repair.sample_time(rng)?;
        queue.push(
            now + delay,
            EventKind::Repair {
                node: self.id,
                server: server_idx,
            },
        );
        Ok(Some(server_idx))
    }

    /// Bring a down server back and immediately look for work.
    pub(crate) fn repair_server(
        &mut self,
        now: SimTime,
        server_idx: usize,
        queue: &mut EventQueue,
        rng: &mut Lcg,
    ) -> Result<(), SimError> {
        match self.servers.get(server_idx).map(|s| &s.state) {
            Some(ServerState::Down) => {}
            other => {
                return Err(SimError::InvariantViolation(format!(
                    "repair addressed server {server_idx} of `{}` in state {other:?}",
                    self.name
                )))
            }
        }
        self.touch(now);
        self.servers[server_idx].state = ServerState::Idle;
        debug!(node = %self.name, server = server_idx, "server repaired");
        self.dispatch(now, queue, rng)
    }

    /// Close the statistics interval at `now` without changing state.
    pub(crate) fn finalize(&mut self, now: SimTime) {
        self.touch(now);
    }

    /// Warmup checkpoint: finalize the transient interval, then zero every
    /// accumulator and restart integration at `now`.
    pub(crate) fn reset_stats(&mut self, now: SimTime) {
        self.touch(now);
        self.stats.reset(now);
    }
}
