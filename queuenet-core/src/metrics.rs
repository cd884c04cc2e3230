//! Metrics facade emission for simulation instrumentation
//!
//! The engine publishes a small set of counters and gauges through the
//! standard `metrics` facade, labelled by node, so any recorder the host
//! installs (Prometheus exporter, test recorder, nothing at all) can observe
//! a run without the engine knowing about it. The authoritative numbers for
//! results stay in [`NodeStats`](crate::stats::NodeStats); these instruments
//! exist for live observation.

use metrics::{counter, gauge};

pub(crate) fn record_arrival(node: &str) {
    counter!("queuenet_arrivals_total", "node" => node.to_string()).increment(1);
}

pub(crate) fn record_completion(node: &str) {
    counter!("queuenet_completions_total", "node" => node.to_string()).increment(1);
}

pub(crate) fn record_renege(node: &str) {
    counter!("queuenet_reneges_total", "node" => node.to_string()).increment(1);
}

pub(crate) fn record_breakdown(node: &str) {
    counter!("queuenet_breakdowns_total", "node" => node.to_string()).increment(1);
}

pub(crate) fn record_exit(node: &str) {
    counter!("queuenet_exits_total", "node" => node.to_string()).increment(1);
}

pub(crate) fn record_queue_depth(node: &str, depth: usize) {
    gauge!("queuenet_queue_depth", "node" => node.to_string()).set(depth as f64);
}
