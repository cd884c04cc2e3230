//! Per-node statistics accumulators
//!
//! Integrals use deferred accumulation: the node remembers when it last
//! changed state, and on the next change the elapsed interval is multiplied
//! into each tracked quantity before the state mutates. Everything is kept
//! in integer nanoseconds so conservation identities (per-server busy + down
//! + idle = observation window) hold exactly.
//!
//! Accumulators run from `t = 0` and are zeroed once at the warmup
//! checkpoint, so the values visible at the end of a run cover exactly the
//! post-warmup window.

use std::time::Duration;

use crate::node::Server;
use crate::time::SimTime;

/// Statistics gathered by a single node over the observation window.
#[derive(Debug)]
pub struct NodeStats {
    last_update: SimTime,
    /// Integral of the waiting-line length over time, in customer-nanoseconds.
    pub queue_integral: u128,
    /// Per-server time spent serving.
    pub busy: Vec<Duration>,
    /// Per-server time spent broken.
    pub down: Vec<Duration>,
    /// Per-server time spent available but unoccupied.
    pub idle: Vec<Duration>,
    /// Customers admitted to the node.
    pub arrivals_total: u64,
    /// Services run to completion.
    pub completed_services: u64,
    /// Customers that abandoned the waiting line.
    pub reneged_total: u64,
    /// Customers whose service started (pairs with `waiting_time_sum`).
    pub served_customers: u64,
    pub waiting_time_sum: Duration,
    /// Customers that left the network from this node (pairs with
    /// `system_time_sum`).
    pub exited: u64,
    pub system_time_sum: Duration,
    /// Individual post-warmup waits, kept for distribution summaries.
    pub waiting_samples: Vec<Duration>,
    /// Individual post-warmup network sojourn times of customers exiting here.
    pub system_samples: Vec<Duration>,
}

impl NodeStats {
    pub fn new(server_count: usize) -> Self {
        Self {
            last_update: SimTime::zero(),
            queue_integral: 0,
            busy: vec![Duration::ZERO; server_count],
            down: vec![Duration::ZERO; server_count],
            idle: vec![Duration::ZERO; server_count],
            arrivals_total: 0,
            completed_services: 0,
            reneged_total: 0,
            served_customers: 0,
            waiting_time_sum: Duration::ZERO,
            exited: 0,
            system_time_sum: Duration::ZERO,
            waiting_samples: Vec::new(),
            system_samples: Vec::new(),
        }
    }

    /// Fold the interval since the last state change into every integral.
    /// Call before mutating the waiting lines or any server state.
    pub fn advance(&mut self, now: SimTime, queue_len: usize, servers: &[Server]) {
        let dt = now - self.last_update;
        if !dt.is_zero() {
            self.queue_integral += queue_len as u128 * dt.as_nanos();
            for (i, server) in servers.iter().enumerate() {
                if server.is_busy() {
                    self.busy[i] += dt;
                } else if server.is_down() {
                    self.down[i] += dt;
                } else {
                    self.idle[i] += dt;
                }
            }
        }
        self.last_update = now;
    }

    /// Warmup checkpoint: discard everything accumulated so far and restart
    /// the integrals from `now`. Idempotent when nothing has accumulated.
    pub fn reset(&mut self, now: SimTime) {
        let servers = self.busy.len();
        *self = Self::new(servers);
        self.last_update = now;
    }

    pub fn record_wait(&mut self, wait: Duration) {
        self.served_customers += 1;
        self.waiting_time_sum += wait;
        self.waiting_samples.push(wait);
    }

    pub fn record_exit(&mut self, sojourn: Duration) {
        self.exited += 1;
        self.system_time_sum += sojourn;
        self.system_samples.push(sojourn);
    }

    pub fn busy_time(&self) -> Duration {
        self.busy.iter().sum()
    }

    pub fn down_time(&self) -> Duration {
        self.down.iter().sum()
    }

    /// Time-average waiting-line length over `window`.
    pub fn mean_queue_length(&self, window: Duration) -> f64 {
        if window.is_zero() {
            return 0.0;
        }
        self.queue_integral as f64 / window.as_nanos() as f64
    }

    /// Fraction of available (non-down) server time spent serving. Reported
    /// as zero when breakdowns consumed the entire window.
    pub fn utilization(&self, window: Duration) -> f64 {
        let capacity = window.as_nanos() * self.busy.len() as u128;
        let available = capacity.saturating_sub(self.down_time().as_nanos());
        if available == 0 {
            return 0.0;
        }
        self.busy_time().as_nanos() as f64 / available as f64
    }

    pub fn reneging_probability(&self) -> f64 {
        self.reneged_total as f64 / self.arrivals_total.max(1) as f64
    }

    /// Mean wait before service, in seconds.
    pub fn mean_waiting_time(&self) -> f64 {
        self.waiting_time_sum.as_secs_f64() / self.served_customers.max(1) as f64
    }

    /// Mean network sojourn of customers exiting at this node, in seconds.
    pub fn mean_system_time(&self) -> f64 {
        self.system_time_sum.as_secs_f64() / self.exited.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Customer, Server, ServerState};
    use crate::types::{CustomerId, EventId};

    fn servers(states: &[ServerState]) -> Vec<Server> {
        states
            .iter()
            .map(|state| {
                let mut server = Server::new();
                server.state = match state {
                    ServerState::Idle => ServerState::Idle,
                    ServerState::Down => ServerState::Down,
                    ServerState::Busy { customer, departure } => ServerState::Busy {
                        customer: customer.clone(),
                        departure: *departure,
                    },
                };
                server
            })
            .collect()
    }

    fn busy_state() -> ServerState {
        ServerState::Busy {
            customer: Customer::new(CustomerId(1), 0, SimTime::zero()),
            departure: EventId(1),
        }
    }

    #[test]
    fn integrals_accumulate_between_updates() {
        let pool = servers(&[busy_state(), ServerState::Down, ServerState::Idle]);
        let mut stats = NodeStats::new(3);

        stats.advance(SimTime::from_secs(2), 4, &pool);
        assert_eq!(stats.queue_integral, 4 * 2_000_000_000);
        assert_eq!(stats.busy[0], Duration::from_secs(2));
        assert_eq!(stats.down[1], Duration::from_secs(2));
        assert_eq!(stats.idle[2], Duration::from_secs(2));

        // A second interval with a different queue length stacks on top.
        stats.advance(SimTime::from_secs(5), 1, &pool);
        assert_eq!(stats.queue_integral, 4 * 2_000_000_000 + 3_000_000_000);
        assert_eq!(stats.busy[0], Duration::from_secs(5));
    }

    #[test]
    fn zero_width_intervals_change_nothing() {
        let pool = servers(&[busy_state()]);
        let mut stats = NodeStats::new(1);
        stats.advance(SimTime::from_secs(1), 3, &pool);
        let snapshot = stats.queue_integral;
        stats.advance(SimTime::from_secs(1), 100, &pool);
        assert_eq!(stats.queue_integral, snapshot);
    }

    #[test]
    fn reset_discards_the_transient_window() {
        let pool = servers(&[busy_state(), ServerState::Idle]);
        let mut stats = NodeStats::new(2);
        stats.advance(SimTime::from_secs(10), 2, &pool);
        stats.arrivals_total = 7;
        stats.record_wait(Duration::from_secs(1));

        stats.reset(SimTime::from_secs(10));
        assert_eq!(stats.queue_integral, 0);
        assert_eq!(stats.arrivals_total, 0);
        assert_eq!(stats.served_customers, 0);
        assert!(stats.waiting_samples.is_empty());
        assert_eq!(stats.busy, vec![Duration::ZERO; 2]);

        // Integration restarts from the reset instant.
        stats.advance(SimTime::from_secs(13), 1, &pool);
        assert_eq!(stats.queue_integral, 3_000_000_000);
    }

    #[test]
    fn utilization_excludes_down_time_from_the_denominator() {
        let pool = servers(&[busy_state(), ServerState::Down]);
        let mut stats = NodeStats::new(2);
        stats.advance(SimTime::from_secs(10), 0, &pool);

        let window = Duration::from_secs(10);
        // 10s busy out of (2 * 10s - 10s down) available.
        assert_eq!(stats.utilization(window), 1.0);
    }

    #[test]
    fn utilization_is_zero_when_no_time_was_available() {
        let pool = servers(&[ServerState::Down]);
        let mut stats = NodeStats::new(1);
        stats.advance(SimTime::from_secs(5), 0, &pool);
        assert_eq!(stats.utilization(Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn ratio_metrics_guard_empty_denominators() {
        let stats = NodeStats::new(1);
        assert_eq!(stats.reneging_probability(), 0.0);
        assert_eq!(stats.mean_waiting_time(), 0.0);
        assert_eq!(stats.mean_system_time(), 0.0);
    }
}
