//! End-to-end behavior of a single station: steady-state agreement with
//! queueing theory, bit-exact determinism, and the same-instant dispatch
//! order made observable through constant distributions.

use queuenet_core::{Distribution, Engine, SimulationConfig};

fn exponential(rate: f64) -> Distribution {
    Distribution::exponential(rate).unwrap()
}

fn constant(value: f64) -> Distribution {
    Distribution::constant(value).unwrap()
}

/// Single queue with Poisson arrivals (rate 3) and exponential service
/// (rate 4): offered load 0.75.
fn mm1_config() -> SimulationConfig {
    SimulationConfig::new(5000.0, 12345)
        .with_node("till", 1, exponential(4.0))
        .with_arrivals("till", exponential(3.0))
        .with_warmup(500.0)
}

#[test]
fn mm1_matches_steady_state_theory() {
    let config = mm1_config();
    let mut engine = Engine::new(&config, config.seed).unwrap();
    let result = engine.run().unwrap();

    // rho = lambda / mu = 0.75.
    let utilization = result.server_utilization["till"];
    assert!(
        (0.70..=0.80).contains(&utilization),
        "utilization {utilization} outside tolerance around 0.75"
    );

    // Lq = rho^2 / (1 - rho) = 2.25.
    let queue_length = result.mean_queue_length["till"];
    assert!(
        (1.75..=2.75).contains(&queue_length),
        "mean queue length {queue_length} outside tolerance around 2.25"
    );

    // Everything that arrives eventually leaves: throughput tracks lambda.
    assert!(
        (2.7..=3.3).contains(&result.throughput),
        "throughput {} outside tolerance around 3.0",
        result.throughput
    );

    // Wq = rho / (mu - lambda) = 0.75; W = 1 / (mu - lambda) = 1.0.
    let waiting = result.mean_waiting_time["till"];
    assert!(
        (0.5..=1.0).contains(&waiting),
        "mean waiting time {waiting} outside tolerance around 0.75"
    );
    let sojourn = result.mean_system_time["till"];
    assert!(
        (0.75..=1.25).contains(&sojourn),
        "mean system time {sojourn} outside tolerance around 1.0"
    );
}

#[test]
fn without_routing_every_completion_exits_at_the_origin() {
    let config = mm1_config();
    let mut engine = Engine::new(&config, config.seed).unwrap();
    let result = engine.run().unwrap();

    let stats = &engine.node("till").unwrap().stats;
    assert_eq!(stats.exited, stats.completed_services);
    assert_eq!(stats.completed_services, result.service_completions["till"]);
    assert!(stats.system_time_sum >= stats.waiting_time_sum);
}

#[test]
fn identical_seeds_reproduce_results_to_full_precision() {
    let config = mm1_config();
    let first = Engine::new(&config, config.seed).unwrap().run().unwrap();
    let second = Engine::new(&config, config.seed).unwrap().run().unwrap();
    assert_eq!(first, second);

    let other_seed = Engine::new(&config, 999).unwrap().run().unwrap();
    assert_ne!(first, other_seed);
}

#[test]
fn zero_warmup_accounts_for_every_customer() {
    let mut config = mm1_config();
    config.warmup = 0.0;
    let mut engine = Engine::new(&config, config.seed).unwrap();
    engine.run().unwrap();

    let node = engine.node("till").unwrap();
    let stats = &node.stats;
    // No reneging configured, so admissions split exactly into completions
    // and the customers still on site at the horizon.
    assert_eq!(
        stats.arrivals_total,
        stats.completed_services + node.population() as u64
    );
    assert_eq!(stats.reneged_total, 0);
}

/// Constant distributions force a departure, a renege and an arrival onto
/// the same instant (t = 1): the schedule is
///
/// - t = 0.0  customer 1 arrives and starts service (1s long)
/// - t = 0.5  customer 2 arrives and queues with 0.5s of patience
/// - t = 1.0  departure of customer 1, renege of customer 2 and the third
///            arrival all collide.
///
/// Departures outrank reneges, so customer 2 must enter service instead of
/// abandoning; its stale renege is discarded without touching anything.
#[test]
fn same_instant_collisions_resolve_departure_first() {
    let config = SimulationConfig::new(1.25, 1)
        .with_node("till", 1, constant(1.0))
        .with_arrivals("till", constant(0.5))
        .with_patience("till", constant(0.5));
    let mut engine = Engine::new(&config, config.seed).unwrap();
    let result = engine.run().unwrap();

    let node = engine.node("till").unwrap();
    let stats = &node.stats;
    assert_eq!(stats.arrivals_total, 3);
    assert_eq!(stats.completed_services, 1);
    // The tied customer was served, not abandoned.
    assert_eq!(stats.reneged_total, 0);
    assert_eq!(stats.served_customers, 2);
    assert_eq!(stats.exited, 1);
    // Customer 2 in service, customer 3 waiting.
    assert_eq!(node.population(), 2);

    // Waits are exact: 0s for customer 1, 0.5s for customer 2.
    assert!((result.mean_waiting_time["till"] - 0.25).abs() < 1e-12);
    // One waiting customer over [0.5, 1.0) and [1.0, 1.25): 0.75 customer-seconds.
    assert!((result.mean_queue_length["till"] - 0.6).abs() < 1e-12);
    // The server never idled.
    assert_eq!(result.server_utilization["till"], 1.0);
}

#[test]
fn queue_drains_when_arrivals_stop_at_the_horizon() {
    // Deterministic, lightly loaded: every customer is served alone.
    let config = SimulationConfig::new(10.0, 3)
        .with_node("till", 1, constant(0.25))
        .with_arrivals("till", constant(1.0));
    let mut engine = Engine::new(&config, config.seed).unwrap();
    let result = engine.run().unwrap();

    let stats = &engine.node("till").unwrap().stats;
    // Arrivals at 0, 1, ..., 9; each service ends 0.25s later.
    assert_eq!(stats.arrivals_total, 10);
    assert_eq!(stats.completed_services, 10);
    assert_eq!(engine.node("till").unwrap().population(), 0);
    assert_eq!(result.mean_queue_length["till"], 0.0);
    assert!((result.server_utilization["till"] - 0.25).abs() < 1e-9);
}
