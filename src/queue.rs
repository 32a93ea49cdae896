use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::hitbox::HitboxId;
use crate::types::EventKind;

/// Insertion-ordered id of a queued event; breaks ties between equal times.
pub(crate) type EventId = u64;

/// What to do when a queued event comes due.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Action {
    /// Candidate collision or separation of a pair, stamped with both epochs.
    Pair { a: HitboxId, b: HitboxId, epoch_a: u64, epoch_b: u64, kind: EventKind },
    /// Re-index a moving hitbox before its swept bounds outgrow the grid.
    Reiterate { hitbox: HitboxId, epoch: u64 },
}

impl Action {
    pub fn hitboxes(&self) -> (HitboxId, Option<HitboxId>) {
        match *self {
            Action::Pair { a, b, .. } => (a, Some(b)),
            Action::Reiterate { hitbox, .. } => (hitbox, None),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ScheduledEvent {
    pub time: f64,
    pub action: Action,
}

/// Min-queue ordered by `(time, id)`.
///
/// Cancelled events leave their heap entry behind and are skipped when they
/// surface; the head of the heap is always a live event.
pub(crate) struct EventQueue {
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, EventId)>>,
    live: FxHashMap<EventId, ScheduledEvent>,
    next_id: EventId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), live: FxHashMap::default(), next_id: 0 }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn push(&mut self, event: ScheduledEvent) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((OrderedFloat(event.time), id)));
        self.live.insert(id, event);
        id
    }

    pub fn cancel(&mut self, id: EventId) -> Option<ScheduledEvent> {
        let event = self.live.remove(&id)?;
        self.prune();
        Some(event)
    }

    pub fn peek_time(&self) -> f64 {
        self.heap.peek().map_or(f64::INFINITY, |Reverse((time, _))| time.0)
    }

    /// Pop the earliest event if it is due by `max_time`.
    pub fn pop_due(&mut self, max_time: f64, inclusive: bool) -> Option<(EventId, ScheduledEvent)> {
        let &Reverse((OrderedFloat(time), id)) = self.heap.peek()?;
        let due = if inclusive { time <= max_time } else { time < max_time };
        if !due {
            return None;
        }
        self.heap.pop();
        let event = self.live.remove(&id);
        debug_assert!(event.is_some(), "dead event at the head of the queue");
        self.prune();
        event.map(|e| (id, e))
    }

    fn prune(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.live.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
        // keep dead entries from piling up under a churning head
        if self.heap.len() > 2 * self.live.len() + 64 {
            self.heap = self.live.iter().map(|(&id, e)| Reverse((OrderedFloat(e.time), id))).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reiterate(index: u32, time: f64) -> ScheduledEvent {
        ScheduledEvent { time, action: Action::Reiterate { hitbox: HitboxId::new(index, 0), epoch: 0 } }
    }

    #[test]
    fn test_orders_by_time_then_insertion() {
        let mut q = EventQueue::new();
        let late = q.push(reiterate(0, 5.0));
        let first_tie = q.push(reiterate(1, 1.0));
        let second_tie = q.push(reiterate(2, 1.0));
        assert_eq!(q.peek_time(), 1.0);
        assert_eq!(q.pop_due(10.0, true).map(|(id, _)| id), Some(first_tie));
        assert_eq!(q.pop_due(10.0, true).map(|(id, _)| id), Some(second_tie));
        assert_eq!(q.pop_due(10.0, true).map(|(id, _)| id), Some(late));
        assert!(q.pop_due(10.0, true).is_none());
        assert!(q.peek_time().is_infinite());
    }

    #[test]
    fn test_inclusive_bound() {
        let mut q = EventQueue::new();
        q.push(reiterate(0, 2.0));
        assert!(q.pop_due(2.0, false).is_none());
        assert!(q.pop_due(1.0, true).is_none());
        assert!(q.pop_due(2.0, true).is_some());
    }

    #[test]
    fn test_cancel_is_lazy_but_invisible() {
        let mut q = EventQueue::new();
        let a = q.push(reiterate(0, 1.0));
        let b = q.push(reiterate(1, 2.0));
        assert!(q.cancel(a).is_some());
        assert!(q.cancel(a).is_none());
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek_time(), 2.0);
        assert_eq!(q.pop_due(3.0, true).map(|(id, _)| id), Some(b));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_compaction_keeps_live_events() {
        let mut q = EventQueue::new();
        let keep = q.push(reiterate(0, 1000.0));
        for i in 0..500 {
            let id = q.push(reiterate(1, 2000.0 + f64::from(i)));
            q.cancel(id);
        }
        assert!(q.heap.len() <= 2 * q.live.len() + 64);
        assert_eq!(q.peek_time(), 1000.0);
        assert_eq!(q.pop_due(f64::MAX, true).map(|(id, _)| id), Some(keep));
    }
}
