//! Identifier newtypes for simulation entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a scheduled event, monotonic per replication.
///
/// Assigned by the event queue on push; besides identity it is the final
/// tie-breaker among events sharing a timestamp and class, which pins
/// same-key dispatch to insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event({})", self.0)
    }
}

/// Unique identifier of a customer, monotonic per replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub u64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "customer({})", self.0)
    }
}

/// Index of a node in the engine's node table (configuration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node({})", self.0)
    }
}
