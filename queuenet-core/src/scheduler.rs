//! Event queue and same-time ordering discipline
//!
//! The queue is a min-heap over `(time, class rank, event id)`. Time orders
//! everything; among events sharing a timestamp the class rank dictates that
//! completions are observed before derived events (routing) and before the
//! consequences of new arrivals or breakdowns, so statistics always see a
//! consistent instantaneous state; the monotonic event id resolves what
//! remains in insertion order, keeping the heap free of nondeterminism.
//!
//! Cancellation never touches the heap. An event is invalidated through a
//! side channel and silently discarded when it surfaces, which makes
//! cancellation O(1) and preserves the heap invariants. The two cancellation
//! sites are a customer's pending renege (cancelled when the customer enters
//! service or leaves the line for any other reason) and a server's pending
//! departure (cancelled when the server breaks down).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tracing::trace;

use crate::node::Customer;
use crate::time::SimTime;
use crate::types::{CustomerId, EventId, NodeId};

/// The discriminated union of everything the engine can schedule.
///
/// `Routing` and `Arrival` own the customer in flight between nodes; those
/// two classes are never invalidated, so ownership cannot leak through a
/// discarded event. `WarmupReset` and `Terminate` are lifecycle checkpoints
/// emitted once per replication.
#[derive(Debug)]
pub enum EventKind {
    /// Close the transient window: finalize integrals and zero accumulators.
    WarmupReset,
    /// A server finishes serving `customer`.
    Departure {
        node: NodeId,
        server: usize,
        customer: CustomerId,
    },
    /// Decide where a customer that just completed service goes next.
    Routing { node: NodeId, customer: Customer },
    /// A waiting customer runs out of patience.
    Renege {
        node: NodeId,
        class: u32,
        customer: CustomerId,
    },
    /// A down server comes back online.
    Repair { node: NodeId, server: usize },
    /// A customer enters a node, fresh from outside or routed from another.
    Arrival { node: NodeId, customer: Customer },
    /// A server at the node fails.
    Breakdown { node: NodeId },
    /// End of the replication horizon.
    Terminate,
}

impl EventKind {
    /// Rank applied between events sharing a timestamp: departures first,
    /// then routing, reneges, repairs, arrivals and breakdowns. The warmup
    /// checkpoint outranks everything at its instant so the window boundary
    /// is crossed before any same-time completion is counted; termination
    /// trails everything at the horizon so no same-time event is lost.
    fn class_rank(&self) -> u8 {
        match self {
            EventKind::WarmupReset => 0,
            EventKind::Departure { .. } => 1,
            EventKind::Routing { .. } => 2,
            EventKind::Renege { .. } => 3,
            EventKind::Repair { .. } => 4,
            EventKind::Arrival { .. } => 5,
            EventKind::Breakdown { .. } => 6,
            EventKind::Terminate => 7,
        }
    }

    /// Stable label for tracing and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::WarmupReset => "warmup_reset",
            EventKind::Departure { .. } => "departure",
            EventKind::Routing { .. } => "routing",
            EventKind::Renege { .. } => "renege",
            EventKind::Repair { .. } => "repair",
            EventKind::Arrival { .. } => "arrival",
            EventKind::Breakdown { .. } => "breakdown",
            EventKind::Terminate => "terminate",
        }
    }
}

/// An event with its position in the total dispatch order.
#[derive(Debug)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub time: SimTime,
    pub kind: EventKind,
}

impl ScheduledEvent {
    fn sort_key(&self) -> (SimTime, u8, EventId) {
        (self.time, self.kind.class_rank(), self.id)
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so std's max-heap pops the minimum key.
        other.sort_key().cmp(&self.sort_key())
    }
}

/// Time-ordered event queue with flag-based invalidation.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    invalidated: HashSet<EventId>,
    next_id: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` at `time` and return its id.
    pub fn push(&mut self, time: SimTime, kind: EventKind) -> EventId {
        self.next_id += 1;
        let id = EventId(self.next_id);
        trace!(event = kind.label(), time = %time, %id, "event scheduled");
        self.heap.push(ScheduledEvent { id, time, kind });
        id
    }

    /// Mark a scheduled event as stale; it will be discarded on pop.
    pub fn invalidate(&mut self, id: EventId) {
        self.invalidated.insert(id);
    }

    /// Remove and return the next live event, discarding stale ones.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        while let Some(event) = self.heap.pop() {
            if self.invalidated.remove(&event.id) {
                trace!(event = event.kind.label(), id = %event.id, "stale event discarded");
                continue;
            }
            return Some(event);
        }
        None
    }

    /// Timestamp of the next live event, if any. Stale heads are discarded
    /// on the way.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        loop {
            let (id, time) = match self.heap.peek() {
                None => return None,
                Some(head) => (head.id, head.time),
            };
            if self.invalidated.contains(&id) {
                self.heap.pop();
                self.invalidated.remove(&id);
            } else {
                return Some(time);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId(0)
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.push(SimTime::from_secs(3), EventKind::Breakdown { node: node() });
        queue.push(SimTime::from_secs(1), EventKind::Breakdown { node: node() });
        queue.push(SimTime::from_secs(2), EventKind::Breakdown { node: node() });

        let times: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.time.as_nanos() / 1_000_000_000)
            .collect();
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn same_time_events_follow_class_order() {
        let t = SimTime::from_secs(5);
        let mut queue = EventQueue::new();
        // Pushed in scrambled order on purpose.
        queue.push(t, EventKind::Breakdown { node: node() });
        queue.push(t, EventKind::Terminate);
        queue.push(
            t,
            EventKind::Renege {
                node: node(),
                class: 0,
                customer: CustomerId(1),
            },
        );
        queue.push(t, EventKind::WarmupReset);
        queue.push(t, EventKind::Repair { node: node(), server: 0 });
        queue.push(
            t,
            EventKind::Departure {
                node: node(),
                server: 0,
                customer: CustomerId(2),
            },
        );
        queue.push(
            t,
            EventKind::Arrival {
                node: node(),
                customer: Customer::new(CustomerId(3), 0, t),
            },
        );
        queue.push(
            t,
            EventKind::Routing {
                node: node(),
                customer: Customer::new(CustomerId(4), 0, t),
            },
        );

        let labels: Vec<&str> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.kind.label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "warmup_reset",
                "departure",
                "routing",
                "renege",
                "repair",
                "arrival",
                "breakdown",
                "terminate",
            ]
        );
    }

    #[test]
    fn insertion_order_breaks_remaining_ties() {
        let t = SimTime::from_secs(1);
        let mut queue = EventQueue::new();
        let first = queue.push(
            t,
            EventKind::Repair {
                node: node(),
                server: 0,
            },
        );
        let second = queue.push(
            t,
            EventKind::Repair {
                node: node(),
                server: 1,
            },
        );
        assert!(first < second);
        assert_eq!(queue.pop().unwrap().id, first);
        assert_eq!(queue.pop().unwrap().id, second);
    }

    #[test]
    fn invalidated_events_are_discarded_silently() {
        let mut queue = EventQueue::new();
        let stale = queue.push(
            SimTime::from_secs(1),
            EventKind::Renege {
                node: node(),
                class: 0,
                customer: CustomerId(1),
            },
        );
        queue.push(SimTime::from_secs(2), EventKind::Terminate);
        queue.invalidate(stale);

        let event = queue.pop().unwrap();
        assert_eq!(event.kind.label(), "terminate");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn peek_time_skips_stale_heads() {
        let mut queue = EventQueue::new();
        let stale = queue.push(SimTime::from_secs(1), EventKind::Breakdown { node: node() });
        queue.push(SimTime::from_secs(4), EventKind::Terminate);
        queue.invalidate(stale);

        assert_eq!(queue.peek_time(), Some(SimTime::from_secs(4)));
        assert_eq!(queue.pop().unwrap().time, SimTime::from_secs(4));
        assert_eq!(queue.peek_time(), None);
    }
}
