//! Structured logging for simulation debugging
//!
//! The engine emits `tracing` events at three levels: `info!` for run
//! boundaries, `debug!` for state-machine milestones (breakdowns, repairs,
//! reneges, the warmup checkpoint), and `trace!` for per-event dispatch and
//! scheduling. The helpers here install a subscriber with sensible defaults;
//! `RUST_LOG` overrides everything, e.g.
//! `RUST_LOG=queuenet_core::engine=trace` to watch the dispatch loop.

use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::time::SimTime;
use crate::types::EventId;

/// Initialize logging at the default `info` level.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info");
}

/// Initialize logging at a specific level ("trace", "debug", "info", "warn"
/// or "error"). The `RUST_LOG` environment variable takes precedence when
/// set.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("queuenet_core={level},queuenet_metrics={level},queuenet={level}").into()
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();

    info!(level, "simulation logging initialized");
}

/// Span covering one replication.
pub fn simulation_span(name: &str, seed: u64) -> Span {
    tracing::info_span!("simulation", name, seed)
}

/// Span covering the dispatch of a single event.
pub fn event_span(id: EventId, label: &'static str, time: SimTime) -> Span {
    tracing::trace_span!("event", %id, label, %time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_can_be_created_without_a_subscriber() {
        let _sim = simulation_span("smoke", 42);
        let _event = event_span(EventId(1), "arrival", SimTime::from_millis(5));
    }
}
